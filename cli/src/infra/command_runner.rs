//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` runs host tools (`useradd`, `psql`, `nginx`,
//! `certbot`, ...) with captured output and a hard timeout.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use turboship_common::Subsystem;

use crate::application::ports::CommandRunner;
use crate::domain::error::ProvisionError;

/// Production `CommandRunner`.
///
/// A `tokio::time::timeout` around `.output().await` only drops the future;
/// the child keeps running. Racing the wait against a sleep with `select!`
/// and calling `child.kill()` guarantees the process is gone on timeout.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn execute(
        &self,
        mut cmd: Command,
        program: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(%program, "spawning");
        let mut child = cmd
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdin_task = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut handle)) => {
                let input = input.to_vec();
                Some(tokio::spawn(async move {
                    // Dropping the handle closes the pipe so the child sees EOF.
                    let _ = handle.write_all(&input).await;
                }))
            }
            _ => None,
        };
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                if let Some(task) = stdin_task {
                    let _ = task.await;
                }
                let status = status.with_context(|| format!("waiting for {program}"))?;
                tracing::debug!(%program, code = ?status.code(), "exited");
                Ok(Output { status, stdout, stderr })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                tracing::warn!(%program, secs = timeout.as_secs(), "killed after timeout");
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}

/// Last non-empty stderr line, falling back to stdout.
#[must_use]
pub fn complaint(output: &Output) -> String {
    let pick = |bytes: &[u8]| {
        String::from_utf8_lossy(bytes)
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
    };
    pick(&output.stderr)
        .or_else(|| pick(&output.stdout))
        .unwrap_or_else(|| "no output".to_string())
}

/// Map a runner result onto the adapter error contract: spawn errors and
/// non-zero exits become `ProvisionError::Failed` naming `what`.
///
/// # Errors
///
/// Returns `ProvisionError::Failed` unless the command ran and exited 0.
pub fn checked(
    subsystem: Subsystem,
    what: &str,
    result: Result<Output>,
) -> Result<Output, ProvisionError> {
    let output = result.map_err(|e| ProvisionError::failed(subsystem, format!("{what}: {e:#}")))?;
    if output.status.success() {
        return Ok(output);
    }
    let code = output
        .status
        .code()
        .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
    Err(ProvisionError::failed(
        subsystem,
        format!("{what} exited with {code}: {}", complaint(&output)),
    ))
}

fn command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        self.execute(command(program, args), program, None, timeout)
            .await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        self.execute(command(program, args), program, Some(input), self.timeout)
            .await
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output> {
        let mut cmd = command(program, args);
        cmd.envs(env.iter().copied());
        self.execute(cmd, program, None, self.timeout).await
    }
}
