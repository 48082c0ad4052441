/// Captured result of one test-tool invocation.
///
/// A failing test run is not an error: the output, tracebacks included, is
/// the payload handed to the implementation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Standard output, a newline, then standard error.
    pub output: String,
    /// `None` when the process was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub summary: Option<TestSummary>,
}

/// Counts parsed from the pytest session summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl TestSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0 && self.passed > 0
    }
}

impl TestReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}
