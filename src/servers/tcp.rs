//! TCP echo server, one task per connection

use super::Server;
use crate::{
    error::{AppError, Result},
    logging::{Logger, NetworkLogger},
    models::TestParameters,
    net::{self, socket, BoundInterface},
    types::Protocol,
};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const LISTEN_BACKLOG: i32 = 1024;

pub struct TcpEchoServer {
    params: TestParameters,
    interface: Option<BoundInterface>,
    logger: Logger,
}

impl TcpEchoServer {
    pub fn new(params: TestParameters, logger: Logger) -> Result<Self> {
        let interface = params.interface().map(BoundInterface::resolve).transpose()?;
        Ok(Self {
            params,
            interface,
            logger,
        })
    }

    /// Read chunk size, one MTU
    pub fn buffer_size(&self) -> usize {
        self.params.mtu()
    }

    /// Listen on `host:port`, binding the device first when one was given
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = self.params.target_addr();
        let raw = net::new_socket(Protocol::Tcp, self.params.ip_version())?;
        raw.set_reuse_address(true)
            .map_err(|e| AppError::socket_option(format!("setsockopt(SO_REUSEADDR) error: {}", e)))?;
        if let Some(iface) = &self.interface {
            socket::bind_to_device(&raw, iface.name())?;
        }

        raw.bind(&addr.into())
            .and_then(|_| raw.listen(LISTEN_BACKLOG))
            .map_err(|e| AppError::network(format!("Failed to listen on {}: {}", addr, e)))?;
        raw.set_nonblocking(true)?;
        Ok(TcpListener::from_std(std::net::TcpListener::from(raw))?)
    }

    /// Accept forever; only an accept error ends the server
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        let local = listener.local_addr()?;
        crate::log_info!(self.logger, "Start TCP Server on {}", local);

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| AppError::network(format!("accept failed: {}", e)))?;

            let net_logger = net_logger.clone();
            let buffer_size = self.buffer_size();
            tokio::spawn(async move {
                echo_connection(stream, peer, buffer_size, net_logger).await;
            });
        }
    }
}

/// Echo until the peer closes or an I/O error occurs; ends only this connection
async fn echo_connection(mut stream: TcpStream, peer: SocketAddr, buffer_size: usize, net_logger: NetworkLogger) {
    let mut buffer = vec![0u8; buffer_size];
    loop {
        let n = match stream.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                crate::log_debug!(net_logger.logger(), "Read from {} failed: {}", peer, e);
                break;
            }
        };
        net_logger.log_packet_received(n, peer).await;

        if let Err(e) = stream.write_all(&buffer[..n]).await {
            crate::log_debug!(net_logger.logger(), "Write to {} failed: {}", peer, e);
            break;
        }
        net_logger.log_packet_written(n, peer).await;
    }

    net_logger
        .logger()
        .info(&format!("Connection from client: {} closed", peer))
        .log()
        .await;
}

#[async_trait]
impl Server for TcpEchoServer {
    fn description(&self) -> String {
        format!("TCP echo server on {}", self.params.target_addr())
    }

    async fn serve(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve_on(listener).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(mtu: usize) -> TcpEchoServer {
        let params = TestParameters::new(Protocol::Tcp, "127.0.0.1".parse().unwrap(), 0).with_mtu(mtu);
        TcpEchoServer::new(params, Logger::new("TCP-SERVER".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_echoes_and_survives_disconnect() {
        let server = std::sync::Arc::new(server(64));
        let listener = server.bind().unwrap();
        let addr = listener.local_addr().unwrap();
        let running = server.clone();
        tokio::spawn(async move { running.serve_on(listener).await });

        // A client that disconnects must not stop the listener
        drop(TcpStream::connect(addr).await.unwrap());

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut reply = [0u8; 5];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"hello");
    }

    #[test]
    fn test_port_in_use_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let params = TestParameters::new(Protocol::Tcp, "127.0.0.1".parse().unwrap(), port);
        let server = TcpEchoServer::new(params, Logger::new("TCP-SERVER".to_string())).unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(async { server.bind().map(|_| ()) });
        assert_eq!(result.unwrap_err().category(), "NETWORK");
    }
}
