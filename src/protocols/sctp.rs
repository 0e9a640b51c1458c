//! One-shot SCTP association test
//!
//! Opens an association, writes one MTU-sized message and closes. There is no
//! reply: the test succeeds when the transport accepted all MTU bytes.

use super::{ConnectivityTest, RunOutcome};
use crate::{
    defaults::{SCTP_MAX_INIT_ATTEMPTS, TCP_DIAL_TIMEOUT},
    error::Result,
    logging::{Logger, NetworkLogger},
    models::TestParameters,
    net::{self, socket, BoundInterface, SctpInitMsg, SocketOptions},
    output::OutputCoordinator,
    types::Protocol,
};
use async_trait::async_trait;
use socket2::Socket;

/// Result of the blocking association attempt
#[derive(Debug)]
enum Association {
    Sent(usize),
    Failed(String),
}

pub struct SctpTest {
    params: TestParameters,
    interface: Option<BoundInterface>,
    output: OutputCoordinator,
    logger: Logger,
}

impl SctpTest {
    pub fn new(params: TestParameters, output: OutputCoordinator, logger: Logger) -> Result<Self> {
        let interface = params.interface().map(BoundInterface::resolve).transpose()?;
        Ok(Self {
            params,
            interface,
            output,
            logger,
        })
    }

    /// Socket with stream counts, INIT retries and fragmentation configured
    fn open_socket(&self) -> Result<Socket> {
        let version = self.params.ip_version();
        let raw = net::new_socket(Protocol::Sctp, version)?;
        socket::set_sctp_init_msg(
            &raw,
            &SctpInitMsg::new(self.params.sctp_streams(), SCTP_MAX_INIT_ATTEMPTS),
        )?;
        let options = SocketOptions::new(Protocol::Sctp, version)
            .interface(self.interface.as_ref().map(BoundInterface::name))
            .timeout(self.params.timeout());
        net::configure(&raw, &options)?;
        Ok(raw)
    }
}

/// Connect, write the whole payload once, close
fn associate_and_send(raw: Socket, target: std::net::SocketAddr, payload: Vec<u8>) -> Association {
    if let Err(e) = raw.connect_timeout(&target.into(), TCP_DIAL_TIMEOUT) {
        return Association::Failed(format!("association with {} failed: {}", target, e));
    }

    let result = match raw.send(&payload) {
        Ok(n) if n == payload.len() => Association::Sent(n),
        Ok(n) => Association::Failed(format!(
            "short write: {} of {} bytes accepted",
            n,
            payload.len()
        )),
        Err(e) => Association::Failed(format!("write failed: {}", e)),
    };
    drop(raw);
    result
}

#[async_trait]
impl ConnectivityTest for SctpTest {
    fn protocol(&self) -> Protocol {
        Protocol::Sctp
    }

    fn parameters(&self) -> &TestParameters {
        &self.params
    }

    async fn execute(&self) -> Result<RunOutcome> {
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        let target = self.params.target_addr();
        let raw = self.open_socket()?;

        self.output
            .display_header(Protocol::Sctp, &self.params.target().to_string(), self.params.mtu())?;

        let payload = self.params.payload();
        let association =
            tokio::task::spawn_blocking(move || associate_and_send(raw, target, payload)).await?;

        match association {
            Association::Sent(bytes) => {
                net_logger.log_connection(&target.to_string(), true, None).await;
                net_logger.log_packet_written(bytes, target).await;
                Ok(RunOutcome::success())
            }
            Association::Failed(reason) => {
                net_logger
                    .log_connection(&target.to_string(), false, Some(&reason))
                    .await;
                Ok(RunOutcome::failed(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unknown_interface_fails_construction() {
        let params = TestParameters::new(Protocol::Sctp, "127.0.0.1".parse().unwrap(), 9000)
            .with_interface("nosuchdev0");
        let result = SctpTest::new(params, OutputCoordinator::silent(), Logger::new("SCTP".to_string()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_association_refused_is_a_run_failure() {
        let params = TestParameters::new(Protocol::Sctp, "127.0.0.1".parse().unwrap(), 9)
            .with_mtu(100)
            .with_timeout(Duration::from_secs(1));
        let test = SctpTest::new(params, OutputCoordinator::silent(), Logger::new("SCTP".to_string()))
            .unwrap();

        // Kernels without SCTP support refuse the socket itself, a setup error
        match test.execute().await {
            Ok(outcome) => {
                assert!(!outcome.succeeded);
                assert!(outcome.failure.is_some());
            }
            Err(e) => assert_eq!(e.category(), "SOCKOPT"),
        }
    }
}
