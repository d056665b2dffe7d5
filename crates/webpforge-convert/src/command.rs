//! Blocking builder for running external encoder binaries with a timeout.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// The text a failed run should be judged by: stderr, or stdout when the
    /// tool reports errors there.
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Why a tool could not produce an exit status.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{tool}: failed to spawn: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool}: I/O error waiting for process: {source}")]
    Wait {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool}: timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use webpforge_convert::ToolCommand;
/// use std::path::PathBuf;
///
/// let output = ToolCommand::new(PathBuf::from("cwebp"))
///     .arg("-q").arg("80")
///     .arg("/path/to/input.png")
///     .arg("-o").arg("/path/to/output.webp")
///     .execute()?;
/// assert!(output.status.success());
/// # Ok::<(), webpforge_convert::command::CommandError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The arguments added so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// A non-zero exit is **not** an error here: the caller decides what the
    /// captured output means. Errors are reserved for spawn failures, wait
    /// failures and timeouts (the child is killed on timeout).
    pub fn execute(&self) -> Result<ToolOutput, CommandError> {
        let tool = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        tracing::debug!(tool = %tool, args = ?self.args, "running tool");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty child cannot block on a
        // full pipe while we poll for its exit.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Timeout {
                        tool,
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    return Err(CommandError::Wait { tool, source });
                }
            }
        };

        Ok(ToolOutput {
            status,
            stdout: stdout.map(collect).unwrap_or_default(),
            stderr: stderr.map(collect).unwrap_or_default(),
        })
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: thread::JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}
