//! Fixed-interval polling and retry on top of a [`CommandRunner`].
//!
//! There is no backoff and no jitter. Elapsed time is counted in whole
//! intervals rather than measured, so a slow command stretches the real
//! wall-clock time past `timeout`.

use std::time::Duration;

use serde::Serialize;

use crate::command::{ClusterCommand, CommandOutput};
use crate::runner::CommandRunner;

/// Interval/timeout pair for [`run_wait_for_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSpec {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub const fn from_secs(interval: u64, timeout: u64) -> Self {
        Self::new(Duration::from_secs(interval), Duration::from_secs(timeout))
    }

    /// Number of attempts this spec allows: `floor(timeout / interval)`, at least one.
    pub fn attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let n = self.timeout.as_nanos() / self.interval.as_nanos();
        u32::try_from(n).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for PollSpec {
    /// 20 s interval, 180 s timeout.
    fn default() -> Self {
        Self::from_secs(20, 180)
    }
}

/// What a polling loop last saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    /// Whether the target substring appeared before the timeout.
    pub found: bool,
    pub output: String,
    pub exit_code: i32,
}

/// Re-run `command` every `spec.interval` until `target` appears in its
/// output or the next attempt would overrun `spec.timeout`.
///
/// The first attempt always happens. Sleeps only between attempts.
pub async fn run_wait_for_status<R: CommandRunner>(
    runner: &R,
    command: &ClusterCommand,
    target: &str,
    spec: PollSpec,
) -> PollOutcome {
    let mut elapsed = Duration::ZERO;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = runner.run(command, None).await;

        if result.output.contains(target) {
            tracing::debug!(command = %command, target, attempt, "Status observed");
            return PollOutcome {
                found: true,
                output: result.output,
                exit_code: result.exit_code,
            };
        }

        elapsed = elapsed.saturating_add(spec.interval);
        let next_fits = elapsed
            .checked_add(spec.interval)
            .is_some_and(|next| next <= spec.timeout);
        if spec.interval.is_zero() || !next_fits {
            tracing::warn!(
                command = %command,
                target,
                attempt,
                timeout_secs = spec.timeout.as_secs(),
                "Timed out while waiting for status",
            );
            return PollOutcome {
                found: false,
                output: result.output,
                exit_code: result.exit_code,
            };
        }

        tokio::time::sleep(spec.interval).await;
    }
}

/// A client-side blocking wait: `<client> wait --for=<condition> --timeout=<n>s <kind> <name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitFor {
    pub resource_type: String,
    pub resource_name: String,
    pub namespace: Option<String>,
    pub condition: String,
    pub timeout_seconds: u64,
}

impl WaitFor {
    /// Wait for `condition=Available` with a 180 s timeout.
    pub fn new(resource_type: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_name: resource_name.into(),
            namespace: None,
            condition: "condition=Available".to_string(),
            timeout_seconds: 180,
        }
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn to_command(&self, client: &str) -> ClusterCommand {
        let cmd = ClusterCommand::new(client)
            .arg("wait")
            .arg(format!("--for={}", self.condition))
            .arg(format!("--timeout={}s", self.timeout_seconds))
            .arg(&self.resource_type)
            .arg(&self.resource_name);
        match &self.namespace {
            Some(ns) => cmd.namespace(ns),
            None => cmd,
        }
    }
}

/// Single invocation of the client's own wait; the timeout is enforced by
/// the client process, not locally.
pub async fn run_wait_for<R: CommandRunner>(runner: &R, wait: &WaitFor) -> CommandOutput {
    let command = wait.to_command(runner.client());
    let result = runner.run(&command, None).await;
    if !result.success() {
        tracing::warn!(
            command = %command,
            exit_code = result.exit_code,
            output = %result.output.trim(),
            "Wait condition not met",
        );
    }
    result
}

/// How many times a failing read is retried, and the pause before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub pause: Duration,
}

impl RetryPolicy {
    /// No retries: the first result is final.
    pub const NONE: Self = Self {
        retries: 0,
        pause: Duration::ZERO,
    };
}

impl Default for RetryPolicy {
    /// 5 retries, 5 s apart.
    fn default() -> Self {
        Self {
            retries: 5,
            pause: Duration::from_secs(5),
        }
    }
}

/// Run `command` and, while it exits non-zero, retry up to `policy.retries`
/// more times. Returns the last result, successful or not.
pub async fn run_with_retry<R: CommandRunner>(
    runner: &R,
    command: &ClusterCommand,
    input: Option<&str>,
    policy: RetryPolicy,
) -> CommandOutput {
    let mut result = runner.run(command, input).await;
    let mut retry = 0u32;

    while !result.success() && retry < policy.retries {
        retry += 1;
        tracing::warn!(
            command = %command,
            exit_code = result.exit_code,
            retry,
            delay_ms = policy.pause.as_millis() as u64,
            "Command failed, retrying",
        );
        tokio::time::sleep(policy.pause).await;
        result = runner.run(command, input).await;
    }

    if !result.success() && policy.retries > 0 {
        tracing::error!(
            command = %command,
            exit_code = result.exit_code,
            retries = policy.retries,
            "Command failed after max retries",
        );
    }
    result
}
