//! Main application orchestration and execution
//!
//! The single decision point between client and server mode. Client runs
//! end in a verdict and its exit code; servers only come back with an error.

use crate::{
    config::{display_config_summary, validate_config},
    error::Result,
    logging::{Logger, LoggerFactory},
    models::Config,
    output::OutputCoordinator,
    protocols::ConnectivityTestFactory,
    servers::{ServerFactory, ServerOptions},
    verdict::Verdict,
};

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    loggers: LoggerFactory,
    output: OutputCoordinator,
}

impl App {
    /// Create a new application instance from a validated configuration
    pub fn new(config: Config) -> Self {
        let output = OutputCoordinator::from_preferences(config.enable_color, config.verbose);
        Self::with_output(config, output)
    }

    /// Create an application instance writing results through `output`
    pub fn with_output(config: Config, output: OutputCoordinator) -> Self {
        Self {
            loggers: LoggerFactory::new(config.clone()),
            config,
            output,
        }
    }

    /// Run the selected mode and return the process exit code
    pub async fn run(self) -> Result<i32> {
        let logger = self.loggers.create_logger("APP").await;
        let warnings = validate_config(&self.config)?;

        if self.config.debug {
            logger
                .debug(&format!("{} v{}", crate::PKG_NAME, crate::VERSION))
                .field("session_id", self.loggers.session_id())
                .log()
                .await;
            for line in display_config_summary(&self.config).lines() {
                logger.debug(line).log().await;
            }
        }

        for warning in &warnings {
            logger.warn(&warning.format(false)).log().await;
        }

        if self.config.listen {
            self.run_server(logger).await
        } else {
            self.run_client(logger).await.map(|verdict| verdict.exit_code())
        }
    }

    /// One client test, ending in a displayed verdict
    pub async fn run_client(&self, logger: Logger) -> Result<Verdict> {
        let params = self.config.test_parameters()?;
        let test_logger = self
            .loggers
            .create_logger(params.protocol().label())
            .await;

        logger
            .info(&format!(
                "Starting {} test to {}",
                params.protocol().label(),
                params.target_addr()
            ))
            .log()
            .await;

        let test = ConnectivityTestFactory::create(params, self.output.clone(), test_logger)?;
        let verdict = test.run().await?;
        self.output.display_verdict(&verdict)?;
        Ok(verdict)
    }

    /// Serve until a fatal error
    async fn run_server(&self, logger: Logger) -> Result<i32> {
        let params = self.config.test_parameters()?;
        let options = ServerOptions {
            keep_going: self.config.keep_going,
        };
        let server_logger = self
            .loggers
            .create_logger(&format!("{}-SERVER", params.protocol().label()))
            .await;

        let server = ServerFactory::create(params, options, server_logger)?;
        logger
            .info(&format!("Starting {}", server.description()))
            .log()
            .await;

        server.serve().await?;
        Ok(0)
    }
}
