//! UDP tests: unicast echo probing and multicast/broadcast reception

use super::{echo_matches, run_echo_loop, ConnectivityTest, EchoSession, RunOutcome};
use crate::{
    error::{AppError, Result},
    logging::{Logger, NetworkLogger},
    models::{ProbeOutcome, ProbeTimer, TestParameters},
    net::{self, socket, BoundInterface, SocketOptions},
    output::OutputCoordinator,
    stats::StatAggregator,
    types::{IpVersion, Protocol, UdpMode},
};
use async_trait::async_trait;
use socket2::{InterfaceIndexOrAddress, SockRef, Socket};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP test in one of three modes fixed at construction.
///
/// Unicast sends MTU-sized datagrams to an echo server and compares the
/// replies. Multicast and broadcast wait for the datagrams a transmitter
/// sends to the group or broadcast address.
pub struct UdpTest {
    params: TestParameters,
    interface: Option<BoundInterface>,
    output: OutputCoordinator,
    logger: Logger,
}

impl UdpTest {
    pub fn new(params: TestParameters, output: OutputCoordinator, logger: Logger) -> Result<Self> {
        let interface = match (params.udp_mode(), params.interface()) {
            (UdpMode::Multicast, Some(name)) => Some(BoundInterface::resolve(name)?),
            (UdpMode::Multicast, None) => {
                return Err(AppError::interface("Multicast mode requires an interface"));
            }
            (_, Some(name)) => BoundInterface::resolve(name).ok(),
            (_, None) => None,
        };

        Ok(Self {
            params,
            interface,
            output,
            logger,
        })
    }

    pub fn mode(&self) -> UdpMode {
        self.params.udp_mode()
    }

    async fn unicast(&self) -> Result<RunOutcome> {
        if let (Some(name), None) = (self.params.interface(), &self.interface) {
            crate::log_warn!(self.logger, "Interface {} not found, sending unbound", name);
        }

        let version = self.params.ip_version();
        let raw = net::new_socket(Protocol::Udp, version)?;
        let options = SocketOptions::new(Protocol::Udp, version)
            .interface(self.interface.as_ref().map(BoundInterface::name))
            .timeout(self.params.timeout());
        net::configure(&raw, &options)?;

        let target = self.params.target_addr();
        raw.connect(&target.into())
            .map_err(|e| AppError::network(format!("Failed to connect UDP socket to {}: {}", target, e)))?;

        let mut session = UdpSession {
            socket: into_tokio(raw)?,
            ip_version: version,
        };
        let stats = run_echo_loop(&mut session, &self.params, &self.output, &self.logger).await?;
        Ok(RunOutcome::from_statistics(stats))
    }

    /// Socket joined to the group, or listening for broadcasts, on the test port
    fn open_receiver(&self) -> Result<UdpSocket> {
        let version = self.params.ip_version();
        let raw = net::new_socket(Protocol::Udp, version)?;
        raw.set_reuse_address(true)
            .map_err(|e| AppError::socket_option(format!("setsockopt(SO_REUSEADDR) error: {}", e)))?;

        let port = self.params.port();
        let group = self.params.target();
        let bind_addr = match self.mode() {
            UdpMode::Multicast => {
                let iface = self
                    .interface
                    .as_ref()
                    .ok_or_else(|| AppError::interface("Multicast mode requires an interface"))?;
                join_group(&raw, group, iface)?;
                SocketAddr::new(group, port)
            }
            _ => {
                raw.set_broadcast(true)
                    .map_err(|e| AppError::socket_option(format!("setsockopt(SO_BROADCAST) error: {}", e)))?;
                SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
            }
        };

        raw.bind(&bind_addr.into())
            .map_err(|e| AppError::network(format!("Failed to listen on {}: {}", bind_addr, e)))?;
        into_tokio(raw)
    }

    async fn receive(&self) -> Result<RunOutcome> {
        let socket = self.open_receiver()?;
        let net_logger = NetworkLogger::from_logger(self.logger.clone());
        let count = self.params.packet_count();
        let mtu = self.params.mtu();
        // One spare byte so an oversized datagram is not silently truncated
        let mut buffer = vec![0u8; mtu + 1];
        let mut aggregator = StatAggregator::new();

        crate::log_info!(
            self.logger,
            "Waiting for {} {} datagrams on {}",
            count,
            self.mode().as_str(),
            self.params.target_addr()
        );

        for sequence in 1..=count {
            let timer = ProbeTimer::start();
            let outcome = match tokio::time::timeout(self.params.timeout(), socket.recv_from(&mut buffer)).await {
                Ok(Ok((bytes, from))) => {
                    net_logger.log_packet_received(bytes, from).await;
                    if bytes == mtu {
                        ProbeOutcome::received(sequence, timer.elapsed(), bytes, Some(from))
                    } else {
                        ProbeOutcome::lost(
                            sequence,
                            timer.elapsed(),
                            format!("datagram of {} bytes from {}, expected {}", bytes, from, mtu),
                        )
                    }
                }
                Ok(Err(e)) => ProbeOutcome::lost(sequence, timer.elapsed(), e.to_string()),
                Err(_) => ProbeOutcome::lost(sequence, timer.elapsed(), "receive timeout"),
            };

            aggregator.record(&outcome);
            if !outcome.received {
                self.logger
                    .warn(&format!(
                        "Receive failed: {}",
                        outcome.error_message.as_deref().unwrap_or("no datagram")
                    ))
                    .outcome(&outcome)
                    .log()
                    .await;
                aggregator.record_unattempted(count - sequence);
                break;
            }
        }

        let stats = aggregator.finish();
        self.output
            .display_statistics(Protocol::Udp, &self.params.target().to_string(), &stats)?;
        Ok(RunOutcome::from_statistics(stats))
    }
}

/// Join the multicast group on the bound interface
fn join_group(raw: &Socket, group: IpAddr, iface: &BoundInterface) -> Result<()> {
    let joined = match group {
        IpAddr::V4(v4) => raw.join_multicast_v4_n(&v4, &InterfaceIndexOrAddress::Index(iface.index())),
        IpAddr::V6(v6) => raw.join_multicast_v6(&v6, iface.index()),
    };
    joined.map_err(|e| {
        AppError::socket_option(format!(
            "Failed to join group {} on {}: {}",
            group,
            iface.name(),
            e
        ))
    })
}

fn into_tokio(raw: Socket) -> Result<UdpSocket> {
    raw.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(std::net::UdpSocket::from(raw))?)
}

struct UdpSession {
    socket: UdpSocket,
    ip_version: IpVersion,
}

#[async_trait]
impl EchoSession for UdpSession {
    async fn probe(&mut self, sequence: u32, payload: &[u8], timeout: Duration) -> Result<ProbeOutcome> {
        // PMTU and timeouts are applied again before every datagram
        {
            let sock_ref = SockRef::from(&self.socket);
            socket::set_path_mtu_discovery(&sock_ref, self.ip_version)?;
            socket::set_timeouts(&sock_ref, timeout)?;
        }

        // One spare byte so an oversized echo is seen as a mismatch
        let mut reply = vec![0u8; payload.len() + 1];
        let timer = ProbeTimer::start();

        if let Err(e) = self.socket.send(payload).await {
            return Ok(ProbeOutcome::lost(sequence, timer.elapsed(), e.to_string()));
        }

        let outcome = match tokio::time::timeout(timeout, self.socket.recv_from(&mut reply)).await {
            Ok(Ok((bytes, from))) if echo_matches(payload, &reply[..bytes]) => {
                ProbeOutcome::received(sequence, timer.elapsed(), bytes, Some(from))
            }
            Ok(Ok(_)) => ProbeOutcome::lost(sequence, timer.elapsed(), "payload mismatch"),
            Ok(Err(e)) => ProbeOutcome::lost(sequence, timer.elapsed(), e.to_string()),
            Err(_) => ProbeOutcome::lost(sequence, timer.elapsed(), "read timeout"),
        };
        Ok(outcome)
    }
}

#[async_trait]
impl ConnectivityTest for UdpTest {
    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    fn parameters(&self) -> &TestParameters {
        &self.params
    }

    async fn execute(&self) -> Result<RunOutcome> {
        match self.mode() {
            UdpMode::Unicast => self.unicast().await,
            UdpMode::Multicast | UdpMode::Broadcast => self.receive().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(port: u16) -> TestParameters {
        TestParameters::new(Protocol::Udp, "127.0.0.1".parse().unwrap(), port)
            .with_mtu(200)
            .with_packet_count(3)
            .with_probe_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(1))
    }

    fn test_for(params: TestParameters) -> Result<UdpTest> {
        UdpTest::new(params, OutputCoordinator::silent(), Logger::new("UDP".to_string()))
    }

    async fn spawn_echo(truncate: bool) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 9001];
            while let Ok((n, from)) = socket.recv_from(&mut buf).await {
                let n = if truncate { n - 1 } else { n };
                if socket.send_to(&buf[..n], from).await.is_err() {
                    break;
                }
            }
        });
        port
    }

    #[tokio::test]
    async fn test_unicast_echo() {
        let port = spawn_echo(false).await;
        let outcome = test_for(params(port)).unwrap().execute().await.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.statistics.unwrap().received, 3);
    }

    #[tokio::test]
    async fn test_short_echo_is_lost() {
        let port = spawn_echo(true).await;
        let outcome = test_for(params(port)).unwrap().execute().await.unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.statistics.unwrap().lost, 3);
    }

    #[tokio::test]
    async fn test_unresolved_interface_falls_back_in_unicast() {
        let port = spawn_echo(false).await;
        let test = test_for(params(port).with_interface("nosuchdev0")).unwrap();
        assert!(test.interface.is_none());
        assert!(test.execute().await.unwrap().succeeded);
    }

    #[test]
    fn test_multicast_requires_interface() {
        let group = TestParameters::new(Protocol::Udp, "239.1.1.1".parse().unwrap(), 5000)
            .with_udp_mode(UdpMode::Multicast);
        assert!(test_for(group.clone()).is_err());
        assert!(test_for(group.with_interface("nosuchdev0")).is_err());
    }

    fn free_port() -> u16 {
        let unused = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        unused.local_addr().unwrap().port()
    }

    fn broadcast_params(port: u16) -> TestParameters {
        TestParameters::new(Protocol::Udp, IpAddr::V4(Ipv4Addr::BROADCAST), port)
            .with_udp_mode(UdpMode::Broadcast)
            .with_mtu(200)
            .with_packet_count(3)
            .with_timeout(Duration::from_secs(1))
    }

    /// Keep sending `size`-byte datagrams to the loopback port
    fn spawn_sender(port: u16, size: usize) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let payload = vec![b'b'; size];
            for _ in 0..200 {
                let _ = sender.send_to(&payload, ("127.0.0.1", port)).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
    }

    #[tokio::test]
    async fn test_broadcast_receiver_counts_datagrams() {
        let port = free_port();
        let sender = spawn_sender(port, 200);
        let outcome = test_for(broadcast_params(port)).unwrap().execute().await.unwrap();
        sender.abort();

        assert!(outcome.succeeded);
        let stats = outcome.statistics.unwrap();
        assert_eq!(stats.transmitted, 3);
        assert_eq!(stats.received, 3);
    }

    #[tokio::test]
    async fn test_receiver_rejects_datagram_of_other_size() {
        for size in [150, 250] {
            let port = free_port();
            let sender = spawn_sender(port, size);
            let outcome = test_for(broadcast_params(port)).unwrap().execute().await.unwrap();
            sender.abort();

            assert!(!outcome.succeeded, "{}-byte datagrams counted as received", size);
            let stats = outcome.statistics.unwrap();
            assert_eq!(stats.received, 0);
            assert_eq!(stats.lost, 3);
        }
    }

    #[test]
    fn test_group_join_uses_interface_index() {
        // No IPv4 address and an unknown index: joining must not land on the default interface
        let iface = BoundInterface::from_parts("ghost0", 999_999, vec!["2001:db8::1".parse().unwrap()]);
        let raw = net::new_socket(Protocol::Udp, IpVersion::V4).unwrap();
        let err = join_group(&raw, "239.1.2.3".parse().unwrap(), &iface).unwrap_err();
        assert_eq!(err.category(), "SOCKOPT");
        assert!(err.to_string().contains("ghost0"));
    }

    #[tokio::test]
    async fn test_broadcast_receiver_times_out() {
        let port = free_port();
        let params = broadcast_params(port).with_timeout(Duration::from_millis(200));
        let outcome = test_for(params).unwrap().execute().await.unwrap();
        assert!(!outcome.succeeded);
        let stats = outcome.statistics.unwrap();
        assert_eq!(stats.transmitted, 3);
        assert_eq!(stats.lost, 3);
    }
}
