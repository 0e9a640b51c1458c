//! ICMP test through the system `ping`

use super::{CommandRunner, ConnectivityTest, RunOutcome};
use crate::{
    error::Result,
    logging::Logger,
    models::TestParameters,
    net::BoundInterface,
    output::OutputCoordinator,
    types::Protocol,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs `ping` with the don't-fragment flag and judges its exit status
pub struct IcmpTest {
    params: TestParameters,
    interface: Option<BoundInterface>,
    runner: Arc<dyn CommandRunner>,
    output: OutputCoordinator,
    logger: Logger,
}

impl IcmpTest {
    pub fn new(
        params: TestParameters,
        runner: Arc<dyn CommandRunner>,
        output: OutputCoordinator,
        logger: Logger,
    ) -> Result<Self> {
        let interface = params.interface().map(BoundInterface::resolve).transpose()?;
        Ok(Self {
            params,
            interface,
            runner,
            output,
            logger,
        })
    }

    /// The `ping` command line for this test
    pub fn command_line(&self) -> String {
        let count = self.params.packet_count();
        let mut command = format!(
            "ping -{} {} -c {} -w {} -s {} -M do",
            self.params.ip_version().number(),
            self.params.target(),
            count,
            count,
            self.params.mtu()
        );
        if let Some(iface) = &self.interface {
            command.push_str(&format!(" -I {}", iface.name()));
        }
        command
    }
}

#[async_trait]
impl ConnectivityTest for IcmpTest {
    fn protocol(&self) -> Protocol {
        Protocol::Icmp
    }

    fn parameters(&self) -> &TestParameters {
        &self.params
    }

    async fn execute(&self) -> Result<RunOutcome> {
        let command = self.command_line();
        crate::log_info!(self.logger, "Executing command: {}", command);

        match self.runner.run(&command).await {
            Ok(stdout) => {
                for line in stdout.lines() {
                    self.logger.debug(line).log().await;
                }
                Ok(RunOutcome::success())
            }
            Err(e) => {
                self.output.display_error(&e.to_string())?;
                Ok(RunOutcome::failed(e.to_string()))
            }
        }
    }
}
