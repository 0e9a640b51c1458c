//! Server side: echo servers, sinks and the group transmitter
//!
//! Servers run until a fatal I/O error, which is returned to the caller
//! instead of ending the process. The transmitter never returns on its own.

pub mod sctp;
pub mod tcp;
pub mod transmitter;
pub mod udp;

pub use sctp::SctpSinkServer;
pub use tcp::TcpEchoServer;
pub use transmitter::GroupTransmitter;
pub use udp::UdpEchoServer;

use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::TestParameters,
    types::{Protocol, UdpMode},
};
use async_trait::async_trait;

/// Uniform capability of every server
#[async_trait]
pub trait Server: Send + Sync {
    /// Short description for the startup log line
    fn description(&self) -> String;

    /// Serve until a fatal error occurs
    async fn serve(&self) -> Result<()>;
}

/// Options that only affect servers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerOptions {
    /// Keep the UDP echo server running after a failed read or write
    pub keep_going: bool,
}

/// Factory for building the server matching the selected protocol and mode
pub struct ServerFactory;

impl ServerFactory {
    pub fn create(params: TestParameters, options: ServerOptions, logger: Logger) -> Result<Box<dyn Server>> {
        let server: Box<dyn Server> = match (params.protocol(), params.udp_mode()) {
            (Protocol::Udp, UdpMode::Multicast | UdpMode::Broadcast) => {
                Box::new(GroupTransmitter::new(params, logger)?)
            }
            (Protocol::Udp, UdpMode::Unicast) => {
                Box::new(UdpEchoServer::new(params, logger).keep_going(options.keep_going))
            }
            (Protocol::Tcp, _) => Box::new(TcpEchoServer::new(params, logger)?),
            (Protocol::Sctp, _) => Box::new(SctpSinkServer::new(params, logger)?),
            (Protocol::Icmp, _) => {
                return Err(AppError::validation("Unsupported parameter protocol=icmp in server mode"));
            }
        };
        Ok(server)
    }
}
