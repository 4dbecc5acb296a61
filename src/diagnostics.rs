// Line-oriented diagnostic output: one fixed-width-prefixed line per outcome

use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
pub enum Outcome {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "fail")]
    Fail,
    #[serde(rename = "skip")]
    Skip,
    // Expected to fail and did: counts as a pass
    #[serde(rename = "xfail")]
    ExpectedFail,
    // Expected to fail but passed: counts as a failure
    #[serde(rename = "xpass")]
    UnexpectedPass,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Fail,
        Outcome::ExpectedFail,
        Outcome::UnexpectedPass,
        Outcome::Skip,
        Outcome::Pass,
    ];

    pub const fn prefix(self) -> &'static str {
        match self {
            Outcome::Fail => "FAIL!  : ",
            Outcome::ExpectedFail => "XFAIL  : ",
            Outcome::UnexpectedPass => "XPASS  : ",
            Outcome::Skip => "SKIP   : ",
            Outcome::Pass => "PASS   : ",
        }
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, Outcome::Fail | Outcome::UnexpectedPass)
    }

    /// `expect_msg` is only used by [`Outcome::ExpectedFail`] and is left out
    /// when empty. Messages are ignored by outcomes that carry none.
    pub fn format_line(self, testcase: &str, expect_msg: &str, msg: &str) -> String {
        let prefix = self.prefix();
        match self {
            Outcome::Fail | Outcome::Skip => format!("{prefix}{testcase} {msg}"),
            Outcome::ExpectedFail if expect_msg.is_empty() => format!("{prefix}{testcase} {msg}"),
            Outcome::ExpectedFail => format!("{prefix}{testcase} {expect_msg} {msg}"),
            Outcome::UnexpectedPass | Outcome::Pass => format!("{prefix}{testcase}"),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn line(&self, line: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink {
    pub quiet: bool, // Only print failures
}

impl StdoutSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn prints(&self, line: &str) -> bool {
        !self.quiet
            || Outcome::ALL
                .iter()
                .any(|outcome| outcome.is_failure() && line.starts_with(outcome.prefix()))
    }
}

impl DiagnosticSink for StdoutSink {
    fn line(&self, line: &str) {
        if self.prints(line) {
            println!("{line}");
        }
    }
}

// Clones share the same buffer
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All captured lines, each terminated by a newline.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lines().iter().fold(String::new(), |mut acc, line| {
            acc.push_str(line);
            acc.push('\n');
            acc
        })
    }
}

impl DiagnosticSink for MemorySink {
    fn line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }
}

// Tee: write every line to both sinks
impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for (A, B) {
    fn line(&self, line: &str) {
        self.0.line(line);
        self.1.line(line);
    }
}
