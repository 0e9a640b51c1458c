//! Command-line interface

use clap::Parser;

/// netprobe - MTU-sized connectivity probes over ICMP, TCP, UDP and SCTP
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "netprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Run as a server instead of a client test
    #[arg(long)]
    pub listen: bool,

    /// Network interface / VRF to bind to
    #[arg(long, value_name = "NAME")]
    pub interface: Option<String>,

    /// UDP multicast mode (group address in --server)
    #[arg(long)]
    pub multicast: bool,

    /// UDP broadcast mode
    #[arg(long)]
    pub broadcast: bool,

    /// Protocol: icmp, tcp, udp or sctp
    #[arg(long, value_name = "PROTOCOL")]
    pub protocol: Option<String>,

    /// Payload size in bytes [default: 1450]
    #[arg(long)]
    pub mtu: Option<usize>,

    /// Server IP address (client target, or listen address in server mode)
    #[arg(long, value_name = "IP")]
    pub server: Option<String>,

    /// Server port [default: 80]
    #[arg(long)]
    pub port: Option<u16>,

    /// Expect the path to be blocked
    #[arg(long)]
    pub negative: bool,

    /// Number of probes [default: 5]
    #[arg(short, long)]
    pub count: Option<u32>,

    /// Per-probe timeout in seconds [default: 2]
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Pause before each probe in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// SCTP stream count [default: 5]
    #[arg(long)]
    pub sctp_streams: Option<u16>,

    /// Keep the UDP server running after a failed read or write
    #[arg(long)]
    pub keep_going: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Log output format: console, json or compact
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command Line:\n");
        summary.push_str(&format!("  Mode: {}\n", if self.listen { "server" } else { "client" }));
        if let Some(ref protocol) = self.protocol {
            summary.push_str(&format!("  Protocol: {}\n", protocol));
        }
        if let Some(ref server) = self.server {
            summary.push_str(&format!("  Server: {}\n", server));
        }
        if let Some(ref interface) = self.interface {
            summary.push_str(&format!("  Interface: {}\n", interface));
        }
        if self.multicast {
            summary.push_str("  UDP mode: multicast\n");
        } else if self.broadcast {
            summary.push_str("  UDP mode: broadcast\n");
        }
        if self.negative {
            summary.push_str("  Negative test: Yes\n");
        }
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));

        summary
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 300 {
                Err("Duration cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_client() {
        let cli = Cli::parse_from([
            "netprobe",
            "--protocol", "tcp",
            "--server", "192.0.2.1",
            "--port", "9000",
            "--mtu", "100",
            "--negative",
        ]);
        assert!(!cli.listen);
        assert_eq!(cli.protocol.as_deref(), Some("tcp"));
        assert_eq!(cli.server.as_deref(), Some("192.0.2.1"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.mtu, Some(100));
        assert!(cli.negative);
        assert_eq!(cli.count, None);
    }

    #[test]
    fn test_cli_parsing_server() {
        let cli = Cli::parse_from([
            "netprobe",
            "--listen",
            "--protocol", "udp",
            "--broadcast",
            "--interface", "eth0",
            "--keep-going",
            "--log-format", "json",
        ]);
        assert!(cli.listen);
        assert!(cli.broadcast);
        assert!(cli.keep_going);
        assert_eq!(cli.interface.as_deref(), Some("eth0"));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
    }

    #[test]
    fn test_cli_probe_tuning() {
        let cli = Cli::parse_from([
            "netprobe",
            "--count", "3",
            "--timeout", "4",
            "--interval-ms", "10",
            "--sctp-streams", "8",
        ]);
        assert_eq!(cli.count, Some(3));
        assert_eq!(cli.timeout, Some(4));
        assert_eq!(cli.interval_ms, Some(10));
        assert_eq!(cli.sctp_streams, Some(8));
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration("1").unwrap(), 1);
        assert_eq!(parse_duration("300").unwrap(), 300);
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("301").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("+5").is_err());
    }

    #[test]
    fn test_no_color_disables_colors() {
        let cli = Cli::parse_from(["netprobe", "--no-color"]);
        assert!(!cli.use_colors());
    }

    #[test]
    fn test_config_summary() {
        let cli = Cli::parse_from(["netprobe", "--listen", "--protocol", "sctp", "--multicast"]);
        let summary = cli.get_config_summary();
        assert!(summary.contains("Mode: server"));
        assert!(summary.contains("Protocol: sctp"));
        assert!(summary.contains("UDP mode: multicast"));
    }
}
