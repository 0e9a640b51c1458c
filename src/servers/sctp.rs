//! SCTP sink server
//!
//! Accepts one association at a time, reads one MTU-sized message, logs the
//! byte count and closes before accepting the next.

use super::Server;
use crate::{
    defaults::SCTP_MAX_INIT_ATTEMPTS,
    error::{AppError, Result},
    logging::{Logger, NetworkLogger},
    models::TestParameters,
    net::{self, socket, BoundInterface, SctpInitMsg, SocketOptions},
    types::Protocol,
};
use async_trait::async_trait;
use socket2::Socket;
use std::mem::MaybeUninit;
use std::net::SocketAddr;

const LISTEN_BACKLOG: i32 = 128;

pub struct SctpSinkServer {
    params: TestParameters,
    interface: Option<BoundInterface>,
    logger: Logger,
}

impl SctpSinkServer {
    pub fn new(params: TestParameters, logger: Logger) -> Result<Self> {
        let interface = params.interface().map(BoundInterface::resolve).transpose()?;
        Ok(Self {
            params,
            interface,
            logger,
        })
    }

    /// Listening socket with the same stream and fragmentation setup as the prober
    pub fn bind(&self) -> Result<Socket> {
        let version = self.params.ip_version();
        let addr = self.params.target_addr();
        let raw = net::new_socket(Protocol::Sctp, version)?;
        socket::set_sctp_init_msg(
            &raw,
            &SctpInitMsg::new(self.params.sctp_streams(), SCTP_MAX_INIT_ATTEMPTS),
        )?;
        let options = SocketOptions::new(Protocol::Sctp, version)
            .interface(self.interface.as_ref().map(BoundInterface::name));
        net::configure(&raw, &options)?;
        raw.set_reuse_address(true)
            .map_err(|e| AppError::socket_option(format!("setsockopt(SO_REUSEADDR) error: {}", e)))?;

        raw.bind(&addr.into())
            .and_then(|_| raw.listen(LISTEN_BACKLOG))
            .map_err(|e| AppError::network(format!("Failed to listen on {}: {}", addr, e)))?;
        Ok(raw)
    }

    /// Serve associations serially until an accept or read fails
    pub async fn serve_on(&self, listener: Socket) -> Result<()> {
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        crate::log_info!(self.logger, "Start SCTP Server on {}", self.params.target_addr());

        loop {
            let handle = listener.try_clone()?;
            let mtu = self.params.mtu();
            let (bytes, peer) = tokio::task::spawn_blocking(move || accept_and_read(&handle, mtu)).await??;
            net_logger.log_packet_received(bytes, peer).await;
        }
    }
}

/// Blocking accept, one read, close
fn accept_and_read(listener: &Socket, mtu: usize) -> Result<(usize, SocketAddr)> {
    let (conn, peer) = listener
        .accept()
        .map_err(|e| AppError::network(format!("sctp server error: accept failed: {}", e)))?;
    let peer = peer
        .as_socket()
        .ok_or_else(|| AppError::network("sctp server error: peer is not an IP address"))?;

    let mut buffer: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); mtu];
    let bytes = conn
        .recv(&mut buffer)
        .map_err(|e| AppError::network(format!("sctp server error: read from {} failed: {}", peer, e)))?;
    drop(conn);
    Ok((bytes, peer))
}

#[async_trait]
impl Server for SctpSinkServer {
    fn description(&self) -> String {
        format!("SCTP sink server on {}", self.params.target_addr())
    }

    async fn serve(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve_on(listener).await
    }
}
