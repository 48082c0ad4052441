//! Runs the generated test file and captures what the test tool printed.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{TestReport, TestSummary};

#[derive(Debug, Error)]
pub enum TestRunError {
    #[error("Test file not found at {0}")]
    MissingTestFile(PathBuf),
}

/// Executes a test file.
///
/// Failing tests are a normal outcome and come back as a report, never as an error.
pub trait TestExecutor {
    fn run(&self, test_file: &Path) -> Result<TestReport, TestRunError>;
}

impl<T: TestExecutor + ?Sized> TestExecutor for &T {
    fn run(&self, test_file: &Path) -> Result<TestReport, TestRunError> {
        (**self).run(test_file)
    }
}

/// Runs `<python> -m pytest <file> -v --capture=no` from the file's directory.
#[derive(Debug, Clone)]
pub struct PytestRunner {
    python: String,
}

impl PytestRunner {
    pub fn new(python: impl Into<String>) -> Self {
        Self { python: python.into() }
    }

    fn command(&self, test_file: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-m").arg("pytest");
        match (test_file.parent(), test_file.file_name()) {
            (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => {
                cmd.current_dir(dir).arg(name);
            }
            _ => {
                cmd.arg(test_file);
            }
        }
        cmd.arg("-v").arg("--capture=no");
        cmd
    }
}

impl TestExecutor for PytestRunner {
    fn run(&self, test_file: &Path) -> Result<TestReport, TestRunError> {
        info!("Starting test case execution");
        if !test_file.exists() {
            return Err(TestRunError::MissingTestFile(test_file.to_path_buf()));
        }

        debug!(
            "Running: {} -m pytest {} -v --capture=no",
            self.python,
            test_file.display()
        );
        let output = match self.command(test_file).output() {
            Ok(output) => output,
            Err(e) => {
                // The spawn error stands in for test output so the next prompt still has a report.
                warn!("Error running tests: {}", e);
                return Ok(TestReport {
                    output: e.to_string(),
                    exit_code: None,
                    summary: None,
                });
            }
        };

        let text = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let summary = parse_pytest_summary(&text);
        match &summary {
            Some(s) => info!(
                "Test execution completed: {} passed, {} failed, {} errors, {} skipped",
                s.passed, s.failed, s.errors, s.skipped
            ),
            None => info!("Test execution completed (no pytest summary found)"),
        }

        Ok(TestReport {
            output: text,
            exit_code: output.status.code(),
            summary,
        })
    }
}

fn summary_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^=+ .* in \d+(\.\d+)?s.*=+$").expect("valid regex"))
}

fn outcome_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+) (passed|failed|errors?|skipped)\b").expect("valid regex"))
}

/// Reads counts from the last pytest session summary line, e.g.
/// `==== 2 failed, 3 passed, 1 error in 0.42s ====`.
pub fn parse_pytest_summary(output: &str) -> Option<TestSummary> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| summary_line_re().is_match(line))?;

    let mut summary = TestSummary::default();
    for caps in outcome_count_re().captures_iter(line) {
        let count: usize = caps[1].parse().unwrap_or(0);
        match &caps[2] {
            "passed" => summary.passed = count,
            "failed" => summary.failed = count,
            "skipped" => summary.skipped = count,
            _ => summary.errors = count,
        }
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_summary() {
        let output = "\
generated_test_cases.py::test_a PASSED
generated_test_cases.py::test_b FAILED
=================================== FAILURES ===================================
E   assert 1 == 2
=========== 1 failed, 3 passed, 2 errors, 1 skipped in 0.42s ===========
";
        let summary = parse_pytest_summary(output).unwrap();
        assert_eq!(
            summary,
            TestSummary {
                passed: 3,
                failed: 1,
                errors: 2,
                skipped: 1
            }
        );
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_parse_all_passed() {
        let summary = parse_pytest_summary("============ 5 passed in 1.03s ============\n").unwrap();
        assert_eq!(summary.passed, 5);
        assert!(summary.all_passed());
    }

    #[test]
    fn test_parse_single_error() {
        let summary = parse_pytest_summary("==== 1 error in 0.10s ====").unwrap();
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn test_parse_without_summary() {
        assert_eq!(parse_pytest_summary("/usr/bin/python3: No module named pytest"), None);
        assert_eq!(parse_pytest_summary(""), None);
    }

    #[test]
    fn test_missing_test_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("generated_test_cases.py");
        match PytestRunner::new("python3").run(&missing) {
            Err(TestRunError::MissingTestFile(path)) => assert_eq!(path, missing),
            other => panic!("Expected MissingTestFile, got {:?}", other),
        }
    }

    #[test]
    fn test_command_runs_pytest_from_test_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("generated_test_cases.py");

        let cmd = PytestRunner::new("python3").command(&file);

        assert_eq!(cmd.get_program(), "python3");
        let args: Vec<&std::ffi::OsStr> = cmd.get_args().collect();
        assert_eq!(args, ["-m", "pytest", "generated_test_cases.py", "-v", "--capture=no"]);
        assert_eq!(cmd.get_current_dir(), Some(dir.path()));
    }

    #[test]
    fn test_command_without_directory_passes_path() {
        let cmd = PytestRunner::new("python3").command(Path::new("generated_test_cases.py"));

        let args: Vec<&std::ffi::OsStr> = cmd.get_args().collect();
        assert_eq!(args, ["-m", "pytest", "generated_test_cases.py", "-v", "--capture=no"]);
        assert_eq!(cmd.get_current_dir(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_report_combines_stdout_and_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let interpreter = dir.path().join("fake-python");
        std::fs::write(
            &interpreter,
            "#!/bin/sh\necho \"==== 1 failed, 2 passed in 0.01s ====\"\necho boom >&2\nexit 3\n",
        )
        .unwrap();
        std::fs::set_permissions(&interpreter, std::fs::Permissions::from_mode(0o755)).unwrap();
        let file = dir.path().join("generated_test_cases.py");
        std::fs::write(&file, "def test_a(): assert False").unwrap();

        let report = PytestRunner::new(interpreter.to_string_lossy()).run(&file).unwrap();

        assert_eq!(report.output, "==== 1 failed, 2 passed in 0.01s ====\n\nboom\n");
        assert_eq!(report.exit_code, Some(3));
        let summary = report.summary.unwrap();
        assert_eq!((summary.passed, summary.failed), (2, 1));
        assert!(!report.succeeded());
    }

    #[test]
    fn test_unavailable_interpreter_yields_report() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("generated_test_cases.py");
        std::fs::write(&file, "def test_a(): assert True").unwrap();

        let report = PytestRunner::new("tdforge-no-such-python").run(&file).unwrap();

        assert_eq!(report.exit_code, None);
        assert!(!report.output.is_empty());
        assert!(report.summary.is_none());
        assert!(!report.succeeded());
    }
}
