//! Step runner: one shell command at a time, output appended to a single log
//!
//! Every step runs under `bash -c`, prefixed by the session environment, with
//! stdout and stderr merged into the log while a spinner ticks. A non-zero exit
//! prints the tail of the log and becomes `InstallError::StepFailed`.

use crate::install::error::{InstallError, IoSnafu};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use snafu::ResultExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lines of log shown when a step fails
pub const FAILURE_TAIL_LINES: usize = 20;

/// One unit of orchestrated work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub description: String,
    pub command: String,
    /// Working directory; a missing directory fails the step before it starts
    pub dir: Option<PathBuf>,
}

impl Step {
    pub fn new(description: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: command.into(),
            dir: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

/// Append-only log shared by every step of a run
#[derive(Debug, Clone)]
pub struct StepLog {
    path: PathBuf,
}

impl StepLog {
    /// Create `zond-setup-*.log` in the system temp dir; it outlives the process
    pub fn create() -> Result<Self, InstallError> {
        let file = tempfile::Builder::new()
            .prefix("zond-setup-")
            .suffix(".log")
            .tempfile()
            .context(IoSnafu {
                action: "create log file",
            })?;

        let (_, path) = file.keep().map_err(|e| InstallError::Io {
            action: "persist log file".to_string(),
            source: e.error,
        })?;

        Ok(Self { path })
    }

    /// Use an explicit log path (created on first append)
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_append(&self) -> Result<File, InstallError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|_| IoSnafu {
                action: format!("open log {}", self.path.display()),
            })
    }

    /// Current size in bytes, i.e. where the next step's output starts
    pub fn offset(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Last `n` lines of the log; bytes that are not UTF-8 are replaced, not dropped
    pub fn tail(&self, n: usize) -> Result<Vec<String>, InstallError> {
        let bytes = std::fs::read(&self.path).with_context(|_| IoSnafu {
            action: format!("read log {}", self.path.display()),
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|l| (*l).to_string()).collect())
    }
}

/// Shell lines every step runs before its own command.
///
/// Holds what the legacy script exported into its own session (toolchain
/// activation, GOPATH) without touching this process's environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEnv {
    preamble: Vec<String>,
}

impl SessionEnv {
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !self.preamble.contains(&line) {
            self.preamble.push(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.preamble
    }

    /// Full script for `bash -c`; the command runs in a subshell so its exit
    /// status is the script's
    pub fn wrap(&self, command: &str) -> String {
        if self.preamble.is_empty() {
            return command.to_string();
        }
        format!("{} && ( {command} )", self.preamble.join(" && "))
    }
}

/// Runs steps sequentially against one log
#[derive(Debug)]
pub struct StepRunner {
    log: StepLog,
    env: SessionEnv,
    progress: bool,
}

impl StepRunner {
    pub fn new(log: StepLog, progress: bool) -> Self {
        Self {
            log,
            env: SessionEnv::default(),
            progress,
        }
    }

    pub fn log(&self) -> &StepLog {
        &self.log
    }

    pub fn env(&self) -> &SessionEnv {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut SessionEnv {
        &mut self.env
    }

    fn spinner(&self, description: &str) -> ProgressBar {
        if !self.progress {
            println!("⏳ {description}...");
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏✔"));
        }
        pb.set_message(description.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Run a step and return its exit code; only I/O problems are errors here
    pub fn execute(&self, step: &Step) -> Result<i32, InstallError> {
        let mut log = self.log.open_append()?;
        let offset = self.log.offset();
        writeln!(
            log,
            "==> {} {}\n$ {}",
            Utc::now().to_rfc3339(),
            step.description,
            step.command
        )
        .context(IoSnafu {
            action: "write log header",
        })?;

        tracing::debug!(
            step = %step.description,
            offset,
            dir = ?step.dir,
            "running step"
        );

        let script = self.env.wrap(&step.command);
        let mut expression = duct::cmd("bash", ["-c", script.as_str()])
            .stdin_null()
            .stderr_to_stdout()
            .stdout_file(log)
            .unchecked();
        if let Some(dir) = &step.dir {
            expression = expression.dir(dir);
        }

        let pb = self.spinner(&step.description);
        let result = expression.start().and_then(|handle| handle.wait().map(|out| out.status));
        pb.finish_and_clear();

        let status = result.with_context(|_| IoSnafu {
            action: format!("start '{}'", step.description),
        })?;

        // Killed by a signal: no code to pass through
        let code = status.code().unwrap_or(1);
        tracing::debug!(step = %step.description, code, "step finished");
        Ok(code)
    }

    /// Run a step that must succeed; on failure show the log tail and stop the install
    pub fn run(&self, step: &Step) -> Result<(), InstallError> {
        let code = self.execute(step)?;
        if code == 0 {
            println!("✅ {}", step.description);
            return Ok(());
        }

        eprintln!("❌ {} (exit code {code})", step.description);
        eprintln!("📄 Log file: {}", self.log.path().display());
        match self.log.tail(FAILURE_TAIL_LINES) {
            Ok(lines) => {
                eprintln!("── last {FAILURE_TAIL_LINES} lines ──");
                for line in lines {
                    eprintln!("  {line}");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read log tail");
                eprintln!("⚠️  Could not show the log tail: {e}");
            }
        }

        Err(InstallError::StepFailed {
            description: step.description.clone(),
            code,
            log: self.log.path().to_path_buf(),
        })
    }

    /// Run an optional step; failure prints a warning and the command to run by hand
    pub fn run_soft(&self, step: &Step, remedy: &str) -> bool {
        match self.execute(step) {
            Ok(0) => {
                println!("✅ {}", step.description);
                true
            }
            Ok(code) => {
                tracing::warn!(step = %step.description, code, "optional step failed");
                eprintln!("⚠️  {} failed (exit code {code})", step.description);
                eprintln!("   Run manually: {remedy}");
                false
            }
            Err(e) => {
                tracing::warn!(step = %step.description, error = %e, "optional step failed");
                eprintln!("⚠️  {}: {e}", step.description);
                eprintln!("   Run manually: {remedy}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_in(dir: &Path) -> StepRunner {
        StepRunner::new(StepLog::at(dir.join("install.log")), false)
    }

    #[test]
    fn test_successful_step_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());

        runner
            .run(&Step::new("Saying hello", "echo hello-from-step"))
            .unwrap();

        let log = std::fs::read_to_string(runner.log().path()).unwrap();
        assert!(log.contains("==> "));
        assert!(log.contains("Saying hello"));
        assert!(log.contains("$ echo hello-from-step"));
        assert!(log.contains("hello-from-step\n"));
    }

    #[test]
    fn test_failed_step_propagates_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());

        let err = runner
            .run(&Step::new(
                "Failing on purpose",
                "echo partial-output; echo to-stderr >&2; exit 3",
            ))
            .unwrap_err();

        assert_eq!(err.exit_code(), 3);
        match err {
            InstallError::StepFailed { code, log, .. } => {
                assert_eq!(code, 3);
                let content = std::fs::read_to_string(log).unwrap();
                assert!(content.contains("partial-output"));
                assert!(content.contains("to-stderr"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_session_env_prefixes_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path());
        runner.env_mut().push("export ZOND_TEST_VALUE=from-session");
        runner.env_mut().push("export ZOND_TEST_VALUE=from-session");
        assert_eq!(runner.env().lines().len(), 1);

        runner
            .run(&Step::new("Reading env", "echo value=$ZOND_TEST_VALUE"))
            .unwrap();

        let log = std::fs::read_to_string(runner.log().path()).unwrap();
        assert!(log.contains("value=from-session"));
    }

    #[test]
    fn test_wrap_preserves_command_exit_status() {
        let mut env = SessionEnv::default();
        assert_eq!(env.wrap("make all"), "make all");

        env.push("export A=1");
        env.push("export B=2");
        assert_eq!(env.wrap("exit 4"), "export A=1 && export B=2 && ( exit 4 )");
    }

    #[test]
    fn test_step_runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let runner = runner_in(dir.path());

        runner
            .run(&Step::new("Touching file", "touch marker").in_dir(&work))
            .unwrap();
        assert!(work.join("marker").exists());
    }

    #[test]
    fn test_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());

        let err = runner
            .run(&Step::new("Nowhere", "true").in_dir(dir.path().join("missing")))
            .unwrap_err();
        assert!(matches!(err, InstallError::Io { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_soft_step_failure_does_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());

        assert!(!runner.run_soft(&Step::new("Optional", "exit 1"), "true"));
        assert!(runner.run_soft(&Step::new("Optional ok", "true"), "true"));
    }

    #[test]
    fn test_tail_returns_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.log");
        let content: String = (1..=30).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, content).unwrap();

        let tail = StepLog::at(&path).tail(FAILURE_TAIL_LINES).unwrap();
        assert_eq!(tail.len(), 20);
        assert_eq!(tail.first().map(String::as_str), Some("line 11"));
        assert_eq!(tail.last().map(String::as_str), Some("line 30"));
    }

    #[test]
    fn test_tail_survives_non_utf8_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());

        let err = runner
            .run(&Step::new(
                "Printing latin-1",
                r"printf 'caf\xe9 warning\n'; echo real-error-line; exit 3",
            ))
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);

        let tail = runner.log().tail(FAILURE_TAIL_LINES).unwrap();
        assert!(tail.iter().any(|l| l == "real-error-line"));
        assert!(tail.iter().any(|l| l.starts_with("caf") && l.ends_with(" warning")));
    }

    #[test]
    fn test_tail_of_missing_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StepLog::at(dir.path().join("absent.log"))
            .tail(FAILURE_TAIL_LINES)
            .unwrap_err();
        assert!(matches!(err, InstallError::Io { .. }));
    }

    #[test]
    fn test_create_persists_log_file() {
        let log = StepLog::create().unwrap();
        assert!(log.path().exists());
        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("zond-setup-"));
        assert!(name.ends_with(".log"));
        std::fs::remove_file(log.path()).unwrap();
    }
}
