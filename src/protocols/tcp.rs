//! TCP round-trip test against an echo server

use super::{echo_matches, run_echo_loop, ConnectivityTest, EchoSession, RunOutcome};
use crate::{
    defaults::TCP_DIAL_TIMEOUT,
    error::Result,
    logging::{Logger, NetworkLogger},
    models::{ProbeOutcome, ProbeTimer, TestParameters},
    net::{self, BoundInterface, SocketOptions},
    output::OutputCoordinator,
    types::Protocol,
};
use async_trait::async_trait;
use socket2::Socket;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Dials the target once, then runs the echo probe loop over that connection
pub struct TcpTest {
    params: TestParameters,
    interface: Option<BoundInterface>,
    output: OutputCoordinator,
    logger: Logger,
}

impl TcpTest {
    pub fn new(params: TestParameters, output: OutputCoordinator, logger: Logger) -> Result<Self> {
        let interface = params.interface().map(BoundInterface::resolve).transpose()?;
        Ok(Self {
            params,
            interface,
            output,
            logger,
        })
    }

    /// Socket with PMTU and device binding applied, not yet connected
    fn open_socket(&self) -> Result<Socket> {
        let socket = net::new_socket(Protocol::Tcp, self.params.ip_version())?;
        let options = SocketOptions::new(Protocol::Tcp, self.params.ip_version())
            .interface(self.interface.as_ref().map(BoundInterface::name));
        net::configure(&socket, &options)?;
        Ok(socket)
    }

    /// Connect within the dial timeout; the error string is a run failure
    async fn dial(&self, socket: Socket) -> Result<std::result::Result<TcpStream, String>> {
        let target = self.params.target_addr();
        let connected = tokio::task::spawn_blocking(move || {
            socket.connect_timeout(&target.into(), TCP_DIAL_TIMEOUT)?;
            socket.set_nonblocking(true)?;
            Ok::<_, std::io::Error>(std::net::TcpStream::from(socket))
        })
        .await?;

        match connected {
            Ok(stream) => Ok(Ok(TcpStream::from_std(stream)?)),
            Err(e) => Ok(Err(e.to_string())),
        }
    }
}

struct TcpSession {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

#[async_trait]
impl EchoSession for TcpSession {
    async fn probe(&mut self, sequence: u32, payload: &[u8], timeout: Duration) -> Result<ProbeOutcome> {
        let mut reply = vec![0u8; payload.len()];
        let timer = ProbeTimer::start();

        let stream = &mut self.stream;
        let exchange = async {
            stream.write_all(payload).await?;
            stream.read_exact(&mut reply).await?;
            Ok::<_, std::io::Error>(())
        };

        let outcome = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(())) if echo_matches(payload, &reply) => {
                ProbeOutcome::received(sequence, timer.elapsed(), reply.len(), self.peer)
            }
            Ok(Ok(())) => ProbeOutcome::lost(sequence, timer.elapsed(), "payload mismatch"),
            Ok(Err(e)) => ProbeOutcome::lost(sequence, timer.elapsed(), e.to_string()),
            Err(_) => ProbeOutcome::lost(sequence, timer.elapsed(), "read timeout"),
        };
        Ok(outcome)
    }
}

#[async_trait]
impl ConnectivityTest for TcpTest {
    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    fn parameters(&self) -> &TestParameters {
        &self.params
    }

    async fn execute(&self) -> Result<RunOutcome> {
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        let target = self.params.target_addr().to_string();

        let socket = self.open_socket()?;
        let stream = match self.dial(socket).await? {
            Ok(stream) => stream,
            Err(reason) => {
                net_logger.log_connection(&target, false, Some(&reason)).await;
                return Ok(RunOutcome::failed(format!("dial {} failed: {}", target, reason)));
            }
        };
        net_logger.log_connection(&target, true, None).await;

        let mut session = TcpSession {
            peer: stream.peer_addr().ok(),
            stream,
        };
        let stats = run_echo_loop(&mut session, &self.params, &self.output, &self.logger).await?;
        Ok(RunOutcome::from_statistics(stats))
    }
}

impl std::fmt::Debug for TcpTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTest")
            .field("params", &self.params)
            .field("interface", &self.interface)
            .finish()
    }
}
