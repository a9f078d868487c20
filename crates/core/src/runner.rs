//! The command execution seam.
//!
//! Everything above this module talks to a [`CommandRunner`]; only
//! [`SystemRunner`] actually spawns processes.

use std::future::Future;
use std::sync::Arc;

use crate::command::{ClusterCommand, CommandOutput};
use crate::config::RunnerConfig;
use crate::subprocess;

/// Exit code reported when a program could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Executes one command and reports what happened.
///
/// Implementations never fail: a non-zero exit, or a program that could
/// not be started, is a normal [`CommandOutput`].
pub trait CommandRunner: Send + Sync {
    /// Run `command`, writing `input` to its stdin when present.
    fn run(
        &self,
        command: &ClusterCommand,
        input: Option<&str>,
    ) -> impl Future<Output = CommandOutput> + Send;

    /// The cluster client program commands should be built for.
    fn client(&self) -> &str;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    config: Arc<RunnerConfig>,
}

impl SystemRunner {
    pub fn new(config: Arc<RunnerConfig>) -> Self {
        Self { config }
    }

    /// Build a runner straight from the process environment.
    ///
    /// Fails before anything is executed if `KUBECONFIG` or `PATH` is missing.
    pub fn from_env() -> Result<Self, crate::error::ConfigError> {
        Ok(Self::new(Arc::new(RunnerConfig::from_env()?)))
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ClusterCommand, input: Option<&str>) -> CommandOutput {
        tracing::debug!(command = %command, stdin = input.is_some(), "Running command");

        match subprocess::run_command(command, &self.config, input).await {
            Ok(result) => {
                if result.success() {
                    tracing::debug!(command = %command, "Command succeeded");
                } else {
                    tracing::debug!(
                        command = %command,
                        exit_code = result.exit_code,
                        output = %result.output.trim(),
                        "Command exited non-zero",
                    );
                }
                result
            }
            Err(e) => {
                tracing::error!(command = %command, error = %e, "Failed to start command");
                CommandOutput {
                    output: format!("failed to run {}: {e}", command.program),
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                }
            }
        }
    }

    fn client(&self) -> &str {
        &self.config.client
    }
}
