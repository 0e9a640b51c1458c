//! Error handling for the connectivity probe

use thiserror::Error;

/// Custom error types for the connectivity probe
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parameter validation errors (port, MTU, address ranges)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (addresses, numbers, flags)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Network interface lookup errors
    #[error("Interface error: {0}")]
    Interface(String),

    /// Socket option errors (PMTU discovery, bind device, SCTP options)
    #[error("Socket option error: {0}")]
    SocketOption(String),

    /// Network setup errors (listen, bind, resolve)
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// External command errors (ping)
    #[error("Command execution error: {0}")]
    CommandExecution(String),

    /// Test execution errors
    #[error("Test execution error: {0}")]
    TestExecution(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new interface lookup error
    pub fn interface<S: Into<String>>(message: S) -> Self {
        Self::Interface(message.into())
    }

    /// Create a new socket option error
    pub fn socket_option<S: Into<String>>(message: S) -> Self {
        Self::SocketOption(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new command execution error
    pub fn command_execution<S: Into<String>>(message: S) -> Self {
        Self::CommandExecution(message.into())
    }

    /// Create a new test execution error
    pub fn test_execution<S: Into<String>>(message: S) -> Self {
        Self::TestExecution(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Parse(_) => "PARSE",
            Self::Interface(_) => "INTERFACE",
            Self::SocketOption(_) => "SOCKOPT",
            Self::Network(_) => "NETWORK",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO",
            Self::CommandExecution(_) => "COMMAND",
            Self::TestExecution(_) => "TEST",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the error means the test could not meaningfully run at all.
    ///
    /// Setup errors end the process with a failure regardless of the
    /// negative-test flag.
    pub fn is_fatal_setup(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Validation(_)
            | Self::Parse(_)
            | Self::Interface(_)
            | Self::SocketOption(_)
            | Self::Network(_)
            | Self::Io(_)
            | Self::Internal(_) => true,
            Self::Timeout(_) | Self::CommandExecution(_) | Self::TestExecution(_) => false,
        }
    }

    /// Get exit code for this error type.
    ///
    /// The process exit surface is binary: every error terminates with 1.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Interface(_) | Self::SocketOption(_) | Self::Network(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::CommandExecution(_) | Self::TestExecution(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::TimedOut {
            Self::timeout(error.to_string())
        } else {
            Self::io(error.to_string())
        }
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal(format!("Worker task failed: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error, keeping its category
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            match e.into() {
                AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
                AppError::Validation(msg) => AppError::Validation(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::Parse(format!("{}: {}", context, msg)),
                AppError::Interface(msg) => AppError::Interface(format!("{}: {}", context, msg)),
                AppError::SocketOption(msg) => AppError::SocketOption(format!("{}: {}", context, msg)),
                AppError::Network(msg) => AppError::Network(format!("{}: {}", context, msg)),
                AppError::Timeout(msg) => AppError::Timeout(format!("{}: {}", context, msg)),
                AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
                AppError::CommandExecution(msg) => AppError::CommandExecution(format!("{}: {}", context, msg)),
                AppError::TestExecution(msg) => AppError::TestExecution(format!("{}: {}", context, msg)),
                AppError::Internal(msg) => AppError::Internal(format!("{}: {}", context, msg)),
            }
        })
    }
}

/// Error reporter for user feedback at the process boundary
pub struct ErrorReporter {
    pub use_color: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true)
    }
}
