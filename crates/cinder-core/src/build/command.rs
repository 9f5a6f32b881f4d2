//! External process invocation.
//!
//! Commands are kept as a program plus an argument vector end to end; the
//! `Display` impl exists for log lines only.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long captured output may keep draining after the child exits.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A program, its arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program name for diagnostics.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Arguments as lossy strings, mostly for assertions and logs.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        // Own process group, so a timeout can take down everything the
        // tool spawned.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_quoted(f, arg)?;
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &OsStr) -> fmt::Result {
    let s = s.to_string_lossy();
    if s.is_empty() || s.contains(char::is_whitespace) {
        write!(f, "'{}'", s.replace('\'', r"'\''"))
    } else {
        f.write_str(&s)
    }
}

/// Where a child's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Share the orchestrator's streams directly.
    Inherit,
    /// Buffer each stream and forward it in one write after exit, so
    /// concurrent invocations never interleave within a stream.
    Capture,
}

/// Result of running a [`CommandSpec`].
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status; `None` when the child was killed on timeout.
    pub status: Option<ExitStatus>,
    /// Captured stdout (empty in [`StreamMode::Inherit`]).
    pub stdout: Vec<u8>,
    /// Captured stderr (empty in [`StreamMode::Inherit`]).
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Runs commands synchronously with a deadline.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    timeout: Duration,
    streams: StreamMode,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, streams: StreamMode) -> Self {
        Self { timeout, streams }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `spec` to completion or until the timeout expires.
    ///
    /// Blocks the calling thread. On timeout the child's whole process group
    /// is killed and output it produced is dropped. In capture mode the
    /// buffered output is also forwarded to this process's stdout/stderr
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned or waited on.
    pub fn run(&self, spec: &CommandSpec) -> io::Result<ProcessOutput> {
        let mut cmd = spec.to_command();
        cmd.stdin(Stdio::null());
        match self.streams {
            StreamMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            StreamMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        tracing::debug!("Running {}", spec);
        let mut child = cmd.spawn()?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait_with_deadline(&mut child, self.timeout)?;

        // A timed-out run leaves the readers to finish on their own; an
        // orphan that escaped the group may still hold the pipes.
        let (stdout, stderr) = match status {
            Some(_) => (drain(stdout), drain(stderr)),
            None => (Vec::new(), Vec::new()),
        };
        let output = ProcessOutput {
            status,
            stdout,
            stderr,
        };

        if self.streams == StreamMode::Capture {
            forward(&output);
        }

        Ok(output)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Collect a reader's output, giving up after [`DRAIN_GRACE`] when a
/// background process inherited the pipe and keeps it open.
fn drain(reader: Option<Receiver<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|rx| rx.recv_timeout(DRAIN_GRACE).ok())
        .unwrap_or_default()
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        let now = Instant::now();
        if now >= deadline {
            kill_tree(child);
            child.wait()?;
            return Ok(None);
        }

        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill the child and every process in its group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        // SIGKILL to the whole group; the child is its leader
        if let Ok(pgid) = i32::try_from(child.id()) {
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    // The child may exit between try_wait and kill.
    let _ = child.kill();
}

/// Write captured output as one block per stream.
fn forward(output: &ProcessOutput) {
    if !output.stdout.is_empty() {
        let mut out = io::stdout().lock();
        let _ = out.write_all(&output.stdout);
        let _ = out.flush();
    }
    if !output.stderr.is_empty() {
        let mut err = io::stderr().lock();
        let _ = err.write_all(&output.stderr);
        let _ = err.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_keeps_arguments_separate() {
        let spec = CommandSpec::new("wasm-bindgen")
            .arg("target/my dir/snake.wasm")
            .args(["--out-name", "snake"]);

        assert_eq!(spec.args.len(), 3);
        assert_eq!(spec.arg_strings()[0], "target/my dir/snake.wasm");
        assert_eq!(
            spec.to_string(),
            "wasm-bindgen 'target/my dir/snake.wasm' --out-name snake"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_output() {
        let runner = ProcessRunner::new(Duration::from_secs(10), StreamMode::Capture);
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);

        let output = runner.run(&spec).unwrap();
        assert!(!output.success());
        assert_eq!(output.code(), Some(3));
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let runner = ProcessRunner::new(Duration::from_millis(200), StreamMode::Capture);
        let spec = CommandSpec::new("sh").args(["-c", "exec sleep 5"]);

        let start = Instant::now();
        let output = runner.run(&spec).unwrap();
        assert!(output.timed_out());
        assert!(!output.success());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_does_not_wait_for_grandchildren() {
        let runner = ProcessRunner::new(Duration::from_millis(200), StreamMode::Capture);
        let spec = CommandSpec::new("sh").args(["-c", "sleep 4; true"]);

        let start = Instant::now();
        let output = runner.run(&spec).unwrap();
        assert!(output.timed_out());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process_group() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = ProcessRunner::new(Duration::from_millis(200), StreamMode::Inherit);
        let spec = CommandSpec::new("sh")
            .args(["-c", "(sleep 1; touch leaked) & wait"])
            .current_dir(temp.path());

        assert!(runner.run(&spec).unwrap().timed_out());
        thread::sleep(Duration::from_millis(1500));
        assert!(!temp.path().join("leaked").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_working_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(10), StreamMode::Capture);
        let spec = CommandSpec::new("sh")
            .args(["-c", "touch marker"])
            .current_dir(temp.path());

        assert!(runner.run(&spec).unwrap().success());
        assert!(temp.path().join("marker").exists());
    }

    #[test]
    fn test_spawn_failure() {
        let runner = ProcessRunner::new(Duration::from_secs(1), StreamMode::Inherit);
        let spec = CommandSpec::new("definitely-not-a-real-program-cinder");
        assert!(runner.run(&spec).is_err());
    }
}
