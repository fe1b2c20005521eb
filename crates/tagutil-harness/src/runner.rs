//! Process runner for the binary under test.
//!
//! The command line is the executable path followed by the scenario's
//! argument string, verbatim, handed to the shell. Quoting inside the
//! argument string is therefore interpreted exactly as a user's shell would,
//! including malformed quoting. stdout and stderr share one pipe so the
//! captured text keeps the order in which the child wrote it.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, HarnessResult};

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// True when the process exited with code 0.
    pub success: bool,
    /// Exit code, if the process exited normally (not killed by a signal).
    pub code: Option<i32>,
}

impl ExitStatus {
    /// Status of a process that exited with `code`.
    pub fn from_code(code: i32) -> Self {
        Self {
            success: code == 0,
            code: Some(code),
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Outcome of one invocation: combined output and exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// stdout and stderr, interleaved in emission order.
    pub output: String,
    /// Exit status.
    pub status: ExitStatus,
}

impl ExecutionResult {
    /// True when the process exited with code 0.
    pub fn success(&self) -> bool {
        self.status.success
    }

    /// Exit code, when there is one.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code
    }

    /// Assert that the command succeeded.
    pub fn assert_success(&self) {
        assert!(
            self.success(),
            "Command failed with {}.\noutput:\n{}",
            self.status,
            self.output
        );
    }

    /// Assert that the command failed.
    pub fn assert_failure(&self) {
        assert!(
            !self.success(),
            "Expected command to fail, but it succeeded.\noutput:\n{}",
            self.output
        );
    }
}

/// Quotes `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/._-+,:@%=".contains(&b));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Runs the binary under test inside a working directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Creates a runner for `executable` with no timeout.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: None,
        }
    }

    /// Sets or clears the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The binary under test.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Full shell command line for `argv`.
    pub fn command_line(&self, argv: &str) -> String {
        let exe = self.executable.display().to_string();
        if cfg!(windows) {
            format!("\"{}\" {}", exe, argv)
        } else {
            format!("{} {}", shell_quote(&exe), argv)
        }
    }

    /// Runs the binary with the literal argument string `argv`.
    ///
    /// `env` is overlaid on the inherited environment. A non-zero exit is
    /// reported in the result, never as an error; only a failure to start the
    /// child, to read its output, or a timeout is.
    pub fn run(
        &self,
        argv: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> HarnessResult<ExecutionResult> {
        self.run_with_stdin(argv, cwd, env, None)
    }

    /// Like [`run`](Self::run), feeding `stdin` to the child's standard input.
    pub fn run_with_stdin(
        &self,
        argv: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        stdin: Option<&str>,
    ) -> HarnessResult<ExecutionResult> {
        let command_line = self.command_line(argv);
        tracing::debug!(
            command = %command_line,
            cwd = %cwd.display(),
            env = ?env.keys().collect::<Vec<_>>(),
            stdin_len = stdin.map(str::len),
            "spawning binary under test"
        );

        let mut cmd = shell_command(&command_line);
        cmd.current_dir(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }
        // Its own process group, so a timeout also reaches anything it forked.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

        let program = self.executable.display().to_string();
        let (reader, writer) =
            std::io::pipe().map_err(|e| HarnessError::spawn_failed(program.clone(), e))?;
        let writer_err = writer
            .try_clone()
            .map_err(|e| HarnessError::spawn_failed(program.clone(), e))?;
        cmd.stdout(writer).stderr(writer_err);
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut child = cmd
            .spawn()
            .map_err(|e| HarnessError::spawn_failed(program.clone(), e))?;
        // The command still owns the write ends; the reader only sees EOF once
        // they are closed.
        drop(cmd);

        let feeder = stdin.and_then(|text| feed_stdin(&mut child, text));
        let captured = spawn_collector(reader);

        let status = match self.wait(&mut child, deadline) {
            Ok(status) => status,
            Err(err) => {
                // The whole group is dead, so every write end is closed.
                let _ = captured.recv_timeout(REAP_GRACE);
                return Err(err);
            }
        };
        let output = match self.receive_output(&captured, deadline) {
            Ok(output) => output,
            Err(err) => {
                if matches!(err, HarnessError::Timeout { .. }) {
                    // A descendant outlived the child and still holds the pipe.
                    kill_group(&mut child);
                    let _ = captured.recv_timeout(REAP_GRACE);
                }
                return Err(err);
            }
        };
        if let Some(feeder) = feeder {
            let _ = feeder.join();
        }

        let result = ExecutionResult {
            output: String::from_utf8_lossy(&output).into_owned(),
            status: status.into(),
        };
        tracing::debug!(
            status = %result.status,
            output_len = result.output.len(),
            "binary under test exited"
        );
        Ok(result)
    }

    fn timeout_error(&self) -> HarnessError {
        HarnessError::Timeout {
            program: self.executable.display().to_string(),
            timeout_secs: self.timeout.map_or(0, |t| t.as_secs()),
        }
    }

    fn wait(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
    ) -> HarnessResult<std::process::ExitStatus> {
        let program = self.executable.display().to_string();
        let Some(deadline) = deadline else {
            return child
                .wait()
                .map_err(|e| HarnessError::spawn_failed(program, e));
        };

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        kill_group(child);
                        let _ = child.wait();
                        tracing::warn!(program = %program, "killed after timeout");
                        return Err(self.timeout_error());
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => return Err(HarnessError::spawn_failed(program, e)),
            }
        }
    }

    /// Takes the collector's result, waiting no later than `deadline`.
    fn receive_output(
        &self,
        captured: &Receiver<Captured>,
        deadline: Option<Instant>,
    ) -> HarnessResult<Vec<u8>> {
        let program = self.executable.display().to_string();
        let received = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                captured.recv_timeout(left).map_err(|e| match e {
                    RecvTimeoutError::Timeout => {
                        tracing::warn!(program = %program, "output still open after timeout");
                        self.timeout_error()
                    }
                    RecvTimeoutError::Disconnected => collector_gone(&program),
                })?
            }
            None => captured.recv().map_err(|_| collector_gone(&program))?,
        };
        received.map_err(|source| HarnessError::OutputCaptureFailed { program, source })
    }
}

/// How long to wait for the collector once the child's group is killed.
const REAP_GRACE: Duration = Duration::from_secs(1);

type Captured = std::io::Result<Vec<u8>>;

/// Reads `reader` to the end on its own thread.
fn spawn_collector(mut reader: impl Read + Send + 'static) -> Receiver<Captured> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let captured = reader.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(captured);
    });
    rx
}

fn collector_gone(program: &str) -> HarnessError {
    HarnessError::OutputCaptureFailed {
        program: program.to_string(),
        source: std::io::Error::other("output collector stopped without a result"),
    }
}

/// Kills the child and, on Unix, every process in its group.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let _ = Command::new("sh")
            .arg("-c")
            .arg(format!("kill -s KILL -- {}", group))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
}

fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

/// Writes `text` to the child's stdin from a separate thread, then closes it.
fn feed_stdin(child: &mut Child, text: &str) -> Option<JoinHandle<()>> {
    let mut pipe = child.stdin.take()?;
    let text = text.to_string();
    Some(std::thread::spawn(move || {
        // A child that exits without reading its input is not our problem.
        let _ = pipe.write_all(text.as_bytes());
    }))
}
