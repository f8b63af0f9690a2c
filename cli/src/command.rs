//! A [`LanguageModel`] backed by an external command.
//!
//! The prompt is written to the child's stdin and the complete stdout is
//! taken as the reply. Output is captured up to a byte limit, and a child
//! that outlives its timeout is sent SIGTERM, then killed after a grace
//! period.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use promptfit_core::LanguageModel;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::CommandError;

/// Default time a model command may run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default capture limit for stdout and stderr, each.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024; // 10 MB
const GRACE_PERIOD: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 8 * 1024;

/// Execution limits for a [`CommandModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandModelConfig {
    /// Wall-clock limit for one invocation.
    pub timeout: Duration,
    /// Capture limit per output stream.
    pub max_output_bytes: usize,
    /// Time between SIGTERM and SIGKILL on timeout.
    pub grace_period: Duration,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
}

impl Default for CommandModelConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: MAX_OUTPUT_BYTES,
            grace_period: GRACE_PERIOD,
            cwd: None,
        }
    }
}

impl CommandModelConfig {
    /// Set the invocation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-stream capture limit.
    #[must_use]
    pub const fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Set the SIGTERM grace period.
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Set the child's working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
    /// Wall-clock run time in milliseconds.
    pub duration_ms: u64,
}

/// Runs a program per prompt and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: PathBuf,
    args: Vec<String>,
    config: CommandModelConfig,
}

impl CommandModel {
    /// Model running `program` with no arguments.
    ///
    /// Bare names are resolved through `$PATH`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::ExecutableNotFound` when the program cannot be
    /// located.
    pub fn new(program: impl AsRef<Path>) -> Result<Self, CommandError> {
        Ok(Self {
            program: resolve_program(program.as_ref())?,
            args: Vec::new(),
            config: CommandModelConfig::default(),
        })
    }

    /// Parses a whitespace-separated command line such as `llm -m gpt-4o`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::EmptyCommand` for a blank line, otherwise see
    /// [`CommandModel::new`].
    pub fn from_command_line(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let program = parts.next().ok_or(CommandError::EmptyCommand)?;
        Ok(Self::new(program)?.with_args(parts))
    }

    /// Appends arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replaces the execution limits.
    #[must_use]
    pub fn with_config(mut self, config: CommandModelConfig) -> Self {
        self.config = config;
        self
    }

    /// The resolved program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The execution limits.
    #[must_use]
    pub const fn config(&self) -> &CommandModelConfig {
        &self.config
    }

    /// Runs the program once with `input` on stdin.
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` when the process cannot be spawned, exceeds
    /// the output limit or timeout, or exits unsuccessfully.
    pub async fn run(&self, input: &str) -> Result<RunResult, CommandError> {
        let start_time = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| CommandError::SpawnFailed {
            stage: "spawn subprocess".to_string(),
            source: e,
        })?;

        let stdin = child.stdin.take().ok_or(CommandError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(CommandError::NoStdout)?;
        let stderr = child.stderr.take().ok_or(CommandError::NoStderr)?;
        let pid = child.id().ok_or(CommandError::NoPid)?;
        debug!(pid, program = %self.program.display(), input_bytes = input.len(), "spawned model process");

        let limit = self.config.max_output_bytes;
        let execution_result = timeout(self.config.timeout, async {
            let (_, stdout, stderr) = tokio::try_join!(
                write_input(stdin, input),
                read_bounded(stdout, limit),
                read_bounded(stderr, limit),
            )?;
            let status = child.wait().await.map_err(|e| CommandError::SpawnFailed {
                stage: "wait for child".to_string(),
                source: e,
            })?;
            Ok::<_, CommandError>((status, stdout, stderr))
        })
        .await;

        let elapsed = start_time.elapsed();
        match execution_result {
            Ok(Ok((status, stdout, stderr))) => {
                let exit_code = status.code().unwrap_or(-1);
                let stdout = String::from_utf8_lossy(&stdout).into_owned();
                let stderr = String::from_utf8_lossy(&stderr).into_owned();
                debug!(pid, exit_code, elapsed_ms = elapsed.as_millis(), "model process exited");

                if !status.success() {
                    return Err(CommandError::NonZeroExit {
                        exit_code,
                        pid,
                        elapsed,
                        stderr,
                    });
                }

                Ok(RunResult {
                    stdout,
                    stderr,
                    exit_code,
                    duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                })
            }
            Ok(Err(error)) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(error)
            }
            Err(_timeout_elapsed) => {
                warn!(pid, ?elapsed, "model process timed out, shutting down");
                if let Err(e) = graceful_shutdown(&mut child, pid, self.config.grace_period).await {
                    warn!(pid, error = %e, "failed to shut down timed out model process");
                }
                Err(CommandError::Timeout { elapsed, pid })
            }
        }
    }
}

#[async_trait]
impl LanguageModel for CommandModel {
    type Error = CommandError;

    async fn invoke(&self, prompt: &str) -> Result<String, Self::Error> {
        self.run(prompt).await.map(|result| result.stdout)
    }
}

fn resolve_program(program: &Path) -> Result<PathBuf, CommandError> {
    if program.components().count() > 1 {
        if program.exists() {
            return Ok(program.to_path_buf());
        }
        return Err(CommandError::ExecutableNotFound(format!(
            "Path does not exist: {}",
            program.display()
        )));
    }
    which::which(program)
        .map_err(|e| CommandError::ExecutableNotFound(format!("{}: {e}", program.display())))
}

/// Writes the prompt and closes stdin. A child that exits without reading
/// its input is not an error.
async fn write_input(mut stdin: ChildStdin, input: &str) -> Result<(), CommandError> {
    let written = async {
        stdin.write_all(input.as_bytes()).await?;
        stdin.shutdown().await
    }
    .await;
    match written {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(CommandError::SpawnFailed {
            stage: "write stdin".to_string(),
            source: e,
        }),
        _ => Ok(()),
    }
}

/// Reads a stream to the end, failing once more than `limit` bytes arrive.
async fn read_bounded<R>(mut reader: R, limit: usize) -> Result<Vec<u8>, CommandError>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| CommandError::SpawnFailed {
                stage: "read output".to_string(),
                source: e,
            })?;
        if n == 0 {
            return Ok(captured);
        }
        if captured.len() + n > limit {
            return Err(CommandError::OutputTruncated {
                captured_bytes: captured.len() + n,
                limit_bytes: limit,
            });
        }
        captured.extend_from_slice(&chunk[..n]);
    }
}

/// Graceful shutdown: SIGTERM, wait grace period, then SIGKILL
async fn graceful_shutdown(
    child: &mut Child,
    pid: u32,
    grace_period: Duration,
) -> Result<(), CommandError> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        match i32::try_from(pid) {
            Ok(raw) => {
                if let Err(e) = signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
                    warn!(pid, error = %e, "SIGTERM failed");
                }
            }
            Err(_) => warn!(pid, "PID out of range for SIGTERM"),
        }

        if let Ok(waited) = timeout(grace_period, child.wait()).await {
            return waited.map(|_| ()).map_err(|e| CommandError::SpawnFailed {
                stage: "graceful_shutdown wait".to_string(),
                source: e,
            });
        }
    }
    #[cfg(not(unix))]
    let _ = grace_period;

    // Grace period expired - force kill
    child.kill().await.map_err(|e| CommandError::SpawnFailed {
        stage: "SIGKILL".to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = CommandModelConfig::default()
            .with_timeout(Duration::from_secs(1))
            .with_max_output_bytes(64)
            .with_grace_period(Duration::from_millis(10))
            .with_cwd("/tmp");
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.max_output_bytes, 64);
        assert_eq!(config.grace_period, Duration::from_millis(10));
        assert_eq!(config.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_command_line() {
        assert!(matches!(
            CommandModel::from_command_line("   "),
            Err(CommandError::EmptyCommand)
        ));
    }

    #[test]
    fn test_missing_program() {
        let result = CommandModel::new("promptfit-no-such-program-anywhere");
        assert!(matches!(result, Err(CommandError::ExecutableNotFound(_))));

        let result = CommandModel::new("/definitely/not/here/llm");
        assert!(matches!(result, Err(CommandError::ExecutableNotFound(_))));
    }

    #[tokio::test]
    async fn test_read_bounded_limit() {
        let data: &[u8] = &[b'x'; 100];
        assert_eq!(read_bounded(data, 100).await.unwrap().len(), 100);

        let data: &[u8] = &[b'x'; 100];
        let error = read_bounded(data, 99).await.unwrap_err();
        assert!(matches!(
            error,
            CommandError::OutputTruncated {
                captured_bytes: 100,
                limit_bytes: 99
            }
        ));
    }
}
