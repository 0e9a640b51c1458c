//! netprobe - command-line entry point

use clap::Parser;
use netprobe::{
    app::App,
    cli::Cli,
    config::load_config,
    error::{AppError, ErrorReporter},
};
use std::{error::Error, process};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors());

    let exit_code = match run_application(cli).await {
        Ok(code) => code,
        Err(e) => {
            reporter.report_error(&e);
            if let Some(source) = e.source() {
                eprintln!("Caused by: {}", source);
            }
            print_error_suggestions(&e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<i32, AppError> {
    let config = load_config(cli)?;
    App::new(config).run().await
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Validation(_) | AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Run with --help to list the supported flags");
            eprintln!("  - --mtu must be 50..9000 and --port 1..65534");
            eprintln!("  - --server must be an IP address (a group address with --multicast)");
        }
        AppError::Interface(_) => {
            eprintln!();
            eprintln!("Interface help:");
            eprintln!("  - Check the name with 'ip link'");
            eprintln!("  - Multicast and broadcast modes need an interface with an address of the target's family");
        }
        AppError::SocketOption(_) => {
            eprintln!();
            eprintln!("Socket option help:");
            eprintln!("  - Binding to an interface may need CAP_NET_RAW");
            eprintln!("  - SCTP needs the sctp kernel module loaded");
        }
        AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check whether the port is already in use");
            eprintln!("  - Ports below 1024 need elevated privileges");
        }
        _ => {}
    }
}
