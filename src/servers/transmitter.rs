//! Multicast/broadcast transmitter
//!
//! Sends one MTU-sized datagram to the group (or the broadcast
//! address) every few seconds, from the first usable address of the bound
//! interface. Send failures are logged and the loop carries on.

use super::Server;
use crate::{
    defaults::{TRANSMITTER_SOCKET_TIMEOUT, TRANSMIT_INTERVAL},
    error::{AppError, Result},
    logging::{Logger, NetworkLogger},
    models::TestParameters,
    net::{self, BoundInterface, SocketOptions},
    types::{Protocol, UdpMode},
};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

pub struct GroupTransmitter {
    params: TestParameters,
    interface: BoundInterface,
    source: IpAddr,
    interval: Duration,
    logger: Logger,
}

impl GroupTransmitter {
    /// Fails when no interface was given, it does not exist, or it has no
    /// address of the target's family
    pub fn new(params: TestParameters, logger: Logger) -> Result<Self> {
        let name = params.interface().ok_or_else(|| {
            AppError::interface(format!(
                "{} transmitter requires an interface",
                params.udp_mode().as_str()
            ))
        })?;
        let interface = BoundInterface::resolve(name)?;
        let source = interface.source_address(params.ip_version())?;

        Ok(Self {
            params,
            interface,
            source,
            interval: TRANSMIT_INTERVAL,
            logger,
        })
    }

    /// Pause before each datagram
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Local address datagrams are sent from
    pub fn source_addr(&self) -> SocketAddr {
        SocketAddr::new(self.source, self.params.port())
    }

    /// Group or broadcast destination
    pub fn destination(&self) -> SocketAddr {
        self.params.target_addr()
    }

    /// Socket bound to the source and connected to the destination
    pub fn open(&self) -> Result<UdpSocket> {
        let version = self.params.ip_version();
        let raw = net::new_socket(Protocol::Udp, version)?;

        match (self.params.udp_mode(), self.source) {
            (UdpMode::Broadcast, _) => raw
                .set_broadcast(true)
                .map_err(|e| AppError::socket_option(format!("setsockopt(SO_BROADCAST) error: {}", e)))?,
            (_, IpAddr::V4(local)) => raw
                .set_multicast_if_v4(&local)
                .map_err(|e| AppError::socket_option(format!("setsockopt(IP_MULTICAST_IF) error: {}", e)))?,
            (_, IpAddr::V6(_)) => raw
                .set_multicast_if_v6(self.interface.index())
                .map_err(|e| AppError::socket_option(format!("setsockopt(IPV6_MULTICAST_IF) error: {}", e)))?,
        }

        let options = SocketOptions::new(Protocol::Udp, version)
            .interface(Some(self.interface.name()))
            .timeout(TRANSMITTER_SOCKET_TIMEOUT);
        net::configure(&raw, &options)?;

        let source = self.source_addr();
        let destination = self.destination();
        raw.bind(&source.into())
            .map_err(|e| AppError::network(format!("Failed to bind {}: {}", source, e)))?;
        raw.connect(&destination.into())
            .map_err(|e| AppError::network(format!("Failed to connect to {}: {}", destination, e)))?;

        raw.set_nonblocking(true)?;
        Ok(UdpSocket::from_std(std::net::UdpSocket::from(raw))?)
    }

    /// Wait one interval, then send one payload. Failures are logged here.
    pub async fn transmit_once(&self, socket: &UdpSocket, payload: &[u8], net_logger: &NetworkLogger) -> Result<usize> {
        tokio::time::sleep(self.interval).await;

        let destination = self.destination();
        match socket.send(payload).await {
            Ok(written) => {
                net_logger.log_packet_written(written, destination).await;
                self.logger
                    .info(&format!("Packet sent to {} - OK", destination))
                    .field("bytes", written)
                    .log()
                    .await;
                Ok(written)
            }
            Err(e) => {
                let error = AppError::network(format!("send to {} failed: {}", destination, e));
                self.logger
                    .error(&format!("Packet not sent to {}", destination))
                    .error_info(&error)
                    .log()
                    .await;
                Err(error)
            }
        }
    }
}

#[async_trait]
impl Server for GroupTransmitter {
    fn description(&self) -> String {
        format!(
            "UDP {} transmitter {} -> {}",
            self.params.udp_mode().as_str(),
            self.source_addr(),
            self.destination()
        )
    }

    async fn serve(&self) -> Result<()> {
        let socket = self.open()?;
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        let payload = self.params.payload();

        crate::log_info!(self.logger, "Start {}", self.description());

        loop {
            // A failed send only skips this round
            let _ = self.transmit_once(&socket, &payload, &net_logger).await;
        }
    }
}

impl std::fmt::Debug for GroupTransmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupTransmitter")
            .field("params", &self.params)
            .field("interface", &self.interface)
            .field("source", &self.source)
            .field("interval", &self.interval)
            .finish()
    }
}
