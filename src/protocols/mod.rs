//! Per-protocol connectivity tests
//!
//! Each protocol is one type built from a shared [`TestParameters`] value and
//! implementing [`ConnectivityTest`]. `execute` drives the run and reports
//! whether it succeeded; `run` folds that together with the negative flag
//! into a [`Verdict`]. Setup errors (unresolvable interface, socket option
//! failures) are returned as `Err` and never reach the verdict.

pub mod command;
pub mod icmp;
pub mod sctp;
pub mod tcp;
pub mod udp;

pub use command::{CommandRunner, ShellCommandRunner};
pub use icmp::IcmpTest;
pub use sctp::SctpTest;
pub use tcp::TcpTest;
pub use udp::UdpTest;

use crate::{
    error::Result,
    logging::Logger,
    models::{ProbeOutcome, RunStatistics, TestParameters},
    output::OutputCoordinator,
    stats::StatAggregator,
    types::Protocol,
    verdict::Verdict,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How a completed run went, before the negative flag is applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub succeeded: bool,
    pub statistics: Option<RunStatistics>,
    pub failure: Option<String>,
}

impl RunOutcome {
    /// A probe loop finished; it succeeded only if nothing was lost
    pub fn from_statistics(statistics: RunStatistics) -> Self {
        let succeeded = statistics.is_lossless();
        let failure = if succeeded {
            None
        } else {
            Some(format!("{} of {} probes lost", statistics.lost, statistics.transmitted))
        };
        Self {
            succeeded,
            statistics: Some(statistics),
            failure,
        }
    }

    /// A one-shot exchange that succeeded
    pub fn success() -> Self {
        Self {
            succeeded: true,
            statistics: None,
            failure: None,
        }
    }

    /// The run failed without producing statistics (dial failure, rejected write)
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self {
            succeeded: false,
            statistics: None,
            failure: Some(reason.into()),
        }
    }
}

/// Uniform capability of every protocol test
#[async_trait]
pub trait ConnectivityTest: Send + Sync {
    /// Protocol under test
    fn protocol(&self) -> Protocol;

    /// Parameters the test was built from
    fn parameters(&self) -> &TestParameters;

    /// Run the test to completion
    async fn execute(&self) -> Result<RunOutcome>;

    /// Run the test and apply the negative flag
    async fn run(&self) -> Result<Verdict> {
        let outcome = self.execute().await?;
        Ok(Verdict::evaluate(
            self.protocol(),
            outcome.succeeded,
            self.parameters().negative(),
        ))
    }
}

/// One connected echo exchange, driven probe by probe by [`run_echo_loop`]
#[async_trait]
pub(crate) trait EchoSession: Send {
    /// Send `payload`, wait for the echo within `timeout` and compare it.
    /// `Err` is reserved for setup failures that must end the run.
    async fn probe(&mut self, sequence: u32, payload: &[u8], timeout: Duration) -> Result<ProbeOutcome>;
}

/// A reply counts only when it is byte-for-byte the sent payload
pub(crate) fn echo_matches(sent: &[u8], received: &[u8]) -> bool {
    sent.len() == received.len() && sent == received
}

/// Drive exactly `packet_count` strictly sequential probes
pub(crate) async fn run_echo_loop(
    session: &mut dyn EchoSession,
    params: &TestParameters,
    output: &OutputCoordinator,
    logger: &Logger,
) -> Result<RunStatistics> {
    let protocol = params.protocol();
    let target = params.target().to_string();
    let payload = params.payload();

    output.display_header(protocol, &target, params.mtu())?;

    let mut aggregator = StatAggregator::new();
    for sequence in 1..=params.packet_count() {
        tokio::time::sleep(params.probe_interval()).await;

        let outcome = session.probe(sequence, &payload, params.timeout()).await?;
        if !outcome.received {
            logger
                .warn(&format!(
                    "{} probe {} lost: {}",
                    protocol.label(),
                    sequence,
                    outcome.error_message.as_deref().unwrap_or("no reply")
                ))
                .outcome(&outcome)
                .log()
                .await;
        }

        output.display_probe(protocol, &outcome)?;
        aggregator.record(&outcome);
    }

    let stats = aggregator.finish();
    output.display_statistics(protocol, &target, &stats)?;
    logger
        .debug(&format!("{} run finished", protocol.label()))
        .statistics(&stats)
        .log()
        .await;

    Ok(stats)
}

/// Factory for building the test matching the selected protocol
pub struct ConnectivityTestFactory;

impl ConnectivityTestFactory {
    /// Build the test; fails when a required interface cannot be resolved
    pub fn create(
        params: TestParameters,
        output: OutputCoordinator,
        logger: Logger,
    ) -> Result<Box<dyn ConnectivityTest>> {
        let test: Box<dyn ConnectivityTest> = match params.protocol() {
            Protocol::Icmp => Box::new(IcmpTest::new(
                params,
                Arc::new(ShellCommandRunner::new()),
                output,
                logger,
            )?),
            Protocol::Tcp => Box::new(TcpTest::new(params, output, logger)?),
            Protocol::Udp => Box::new(UdpTest::new(params, output, logger)?),
            Protocol::Sctp => Box::new(SctpTest::new(params, output, logger)?),
        };
        Ok(test)
    }
}
