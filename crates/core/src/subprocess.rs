//! Child process spawning and output capture.
//!
//! [`run_command`] is the only place a process is started. It applies the
//! configured working directory and environment, feeds optional stdin, and
//! waits for exit without any local timeout.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::command::{ClusterCommand, CommandOutput};
use crate::config::RunnerConfig;

/// Maximum stdout or stderr size captured per stream (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Spawn `command`, write `input` to its stdin if given, and collect its
/// output once it exits.
///
/// The child environment is cleared and rebuilt from `config.env` only.
/// Returns `Err` only when the process could not be spawned or waited on.
pub async fn run_command(
    command: &ClusterCommand,
    config: &RunnerConfig,
    input: Option<&str>,
) -> std::io::Result<CommandOutput> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .current_dir(&config.working_dir)
        .env_clear()
        .envs(&config.env)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    // Drain both pipes while stdin is being written so a chatty child
    // cannot block on a full pipe.
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    if let (Some(mut stdin), Some(data)) = (child.stdin.take(), input) {
        // The child may exit without reading everything; that is its business.
        let _ = stdin.write_all(data.as_bytes()).await;
        drop(stdin);
    }

    let status = child.wait().await?;

    let (mut bytes, stdout_dropped) = stdout_task.await.unwrap_or_default();
    let (stderr_bytes, stderr_dropped) = stderr_task.await.unwrap_or_default();
    bytes.extend(stderr_bytes);

    if stdout_dropped > 0 || stderr_dropped > 0 {
        tracing::warn!(
            command = %command,
            stdout_dropped,
            stderr_dropped,
            limit = MAX_OUTPUT_BYTES,
            "Command output truncated",
        );
    }

    Ok(CommandOutput {
        output: String::from_utf8_lossy(&bytes).into_owned(),
        exit_code: status.code().unwrap_or(-1),
    })
}

/// Read an entire output stream, keeping the first [`MAX_OUTPUT_BYTES`].
///
/// Bytes past the limit are drained and discarded so the child never sees a
/// closed pipe. Returns the kept bytes and the number discarded.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> (Vec<u8>, u64) {
    let mut buf = Vec::new();
    let Some(mut h) = handle else {
        return (buf, 0);
    };
    let _ = (&mut h)
        .take(MAX_OUTPUT_BYTES as u64)
        .read_to_end(&mut buf)
        .await;
    let dropped = tokio::io::copy(&mut h, &mut tokio::io::sink())
        .await
        .unwrap_or(0);
    (buf, dropped)
}
