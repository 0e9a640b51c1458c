//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file(self.cli.debug)?;
        self.parse_without_env_file()
    }

    /// Defaults, then environment variables, then CLI overrides, then validation
    pub fn parse_without_env_file(&self) -> Result<Config> {
        let mut config = Config::default();
        EnvManager::validate_current_env()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(ref protocol) = cli.protocol {
            config.protocol = Some(protocol.trim().parse()?);
        }
        if let Some(ref server) = cli.server {
            config.server = Some(server.clone());
        }
        if let Some(ref interface) = cli.interface {
            config.interface = Some(interface.clone());
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(mtu) = cli.mtu {
            config.mtu = mtu;
        }
        if let Some(count) = cli.count {
            config.packet_count = count;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(interval) = cli.interval_ms {
            config.probe_interval_ms = interval;
        }
        if let Some(streams) = cli.sctp_streams {
            config.sctp_streams = streams;
        }
        if let Some(ref format) = cli.log_format {
            config.log_format = format.parse()?;
        }

        config.listen = cli.listen;
        config.multicast = cli.multicast;
        config.broadcast = cli.broadcast;
        config.negative = cli.negative;
        config.keep_going = cli.keep_going;

        if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            println!("Applied CLI overrides to configuration");
            println!(
                "Final config: protocol={:?}, server={:?}, port={}, mtu={}, count={}, timeout={}s",
                config.protocol, config.server, config.port, config.mtu, config.packet_count, config.timeout_seconds
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!(
        "Protocol: {}",
        config.protocol.map(|p| p.as_str()).unwrap_or("-")
    ));
    summary.push(format!("Mode: {}", if config.listen { "server" } else { "client" }));
    summary.push(format!("Server: {}", config.server_address().unwrap_or("-")));
    summary.push(format!("Port: {}", config.port));
    summary.push(format!("MTU: {}", config.mtu));
    summary.push(format!("Interface: {}", config.interface_name().unwrap_or("-")));
    summary.push(format!("UDP Mode: {}", config.udp_mode().as_str()));
    summary.push(format!("Negative: {}", config.negative));
    summary.push(format!("Probe Count: {}", config.packet_count));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Probe Interval: {}ms", config.probe_interval_ms));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
