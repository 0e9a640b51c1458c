//! UDP sink-and-echo server
//!
//! One socket and one buffer serve every sender, one read-then-write cycle at
//! a time. By default the first failed read or write ends the server.

use super::Server;
use crate::{
    defaults::UDP_SERVER_WRITE_TIMEOUT,
    error::{AppError, Result},
    logging::{Logger, NetworkLogger},
    models::TestParameters,
};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

pub struct UdpEchoServer {
    params: TestParameters,
    logger: Logger,
    keep_going: bool,
}

impl UdpEchoServer {
    pub fn new(params: TestParameters, logger: Logger) -> Self {
        Self {
            params,
            logger,
            keep_going: false,
        }
    }

    /// Log failed reads and writes and keep serving instead of stopping
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// All interfaces of the address family, at the configured port
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.params.ip_version().unspecified(), self.params.port())
    }

    pub async fn bind(&self) -> Result<UdpSocket> {
        let addr = self.listen_addr();
        UdpSocket::bind(addr)
            .await
            .map_err(|e| AppError::network(format!("Failed to listen on {}: {}", addr, e)))
    }

    /// Serve until an I/O error, or forever with `keep_going`
    pub async fn serve_on(&self, socket: UdpSocket) -> Result<()> {
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        let mut buffer = vec![0u8; self.params.mtu()];

        crate::log_info!(self.logger, "Start UDP Server on {}", socket.local_addr()?);

        loop {
            if let Err(e) = self.serve_one(&socket, &mut buffer, &net_logger).await {
                if !self.keep_going {
                    return Err(e);
                }
                self.logger
                    .error(&format!("error occurred: {}", e))
                    .error_info(&e)
                    .log()
                    .await;
            }
        }
    }

    async fn serve_one(&self, socket: &UdpSocket, buffer: &mut [u8], net_logger: &NetworkLogger) -> Result<()> {
        let (n, peer) = socket
            .recv_from(buffer)
            .await
            .map_err(|e| AppError::network(format!("read failed: {}", e)))?;
        net_logger.log_packet_received(n, peer).await;

        let written = tokio::time::timeout(UDP_SERVER_WRITE_TIMEOUT, socket.send_to(&buffer[..n], peer))
            .await
            .map_err(|_| AppError::timeout(format!("write to {} timed out", peer)))?
            .map_err(|e| AppError::network(format!("write to {} failed: {}", peer, e)))?;
        net_logger.log_packet_written(written, peer).await;
        Ok(())
    }
}

#[async_trait]
impl Server for UdpEchoServer {
    fn description(&self) -> String {
        format!("UDP echo server on {}", self.listen_addr())
    }

    async fn serve(&self) -> Result<()> {
        let host = self.params.target();
        if !host.is_unspecified() {
            self.logger
                .warn(&format!(
                    "Parameter server={} ignored in UDP unicast server mode, listening on all interfaces",
                    host
                ))
                .log()
                .await;
        }
        let socket = self.bind().await?;
        self.serve_on(socket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_echo_to_sender() {
        let params = TestParameters::new(Protocol::Udp, "0.0.0.0".parse().unwrap(), 0).with_mtu(100);
        let server = Arc::new(UdpEchoServer::new(params, Logger::new("UDP-SERVER".to_string())));
        let socket = server.bind().await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let running = server.clone();
        tokio::spawn(async move { running.serve_on(socket).await });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(("127.0.0.1", port)).await.unwrap();
        client.send(&[b'a'; 100]).await.unwrap();

        let mut reply = [0u8; 101];
        let n = tokio::time::timeout(Duration::from_secs(2), client.recv(&mut reply))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 100);
        assert!(reply[..n].iter().all(|&b| b == b'a'));
    }

    /// Bound server socket connected to a closed loopback port, holding the
    /// pending port-unreachable error of one datagram sent there
    async fn socket_with_pending_error(server: &UdpEchoServer) -> (UdpSocket, SocketAddr) {
        let peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let socket = server.bind().await.unwrap();
        socket.connect(peer).await.unwrap();
        socket.send(b"x").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        (socket, peer)
    }

    fn server_params() -> TestParameters {
        TestParameters::new(Protocol::Udp, "0.0.0.0".parse().unwrap(), 0).with_mtu(100)
    }

    #[tokio::test]
    async fn test_first_error_stops_server() {
        let server = UdpEchoServer::new(server_params(), Logger::new("UDP-SERVER".to_string()));
        let (socket, _) = socket_with_pending_error(&server).await;

        let err = tokio::time::timeout(Duration::from_secs(2), server.serve_on(socket))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.category(), "NETWORK");
        assert!(err.to_string().contains("read failed"));
    }

    #[tokio::test]
    async fn test_keep_going_serves_after_error() {
        let server = Arc::new(
            UdpEchoServer::new(server_params(), Logger::new("UDP-SERVER".to_string())).keep_going(true),
        );
        let (socket, peer) = socket_with_pending_error(&server).await;
        let port = socket.local_addr().unwrap().port();
        let running = server.clone();
        let handle = tokio::spawn(async move { running.serve_on(socket).await });

        let client = UdpSocket::bind(peer).await.unwrap();
        client.send_to(&[b'k'; 100], ("127.0.0.1", port)).await.unwrap();
        let mut reply = [0u8; 101];
        let n = tokio::time::timeout(Duration::from_secs(2), client.recv(&mut reply))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 100);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[test]
    fn test_listens_on_all_interfaces() {
        let params = TestParameters::new(Protocol::Udp, "192.0.2.1".parse().unwrap(), 5000);
        let server = UdpEchoServer::new(params, Logger::new("UDP-SERVER".to_string())).keep_going(true);
        assert_eq!(server.listen_addr(), "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert!(server.keep_going);
    }
}
