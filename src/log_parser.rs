// Reading outcomes back out of a saved diagnostic log

use crate::diagnostics::Outcome;
use crate::error::{DriverError, Result};
use crate::session::Tally;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub outcome: Outcome,
    pub detail: &'a str, // Test label and messages after the prefix
}

fn outcome_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(FAIL!  |XFAIL  |XPASS  |SKIP   |PASS   ): (.*)$")
            .expect("outcome pattern is valid")
    })
}

// Plain messages yield None
pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let captures = outcome_regex().captures(line)?;
    let tag = captures.get(1)?.as_str();
    let outcome = Outcome::ALL
        .into_iter()
        .find(|outcome| outcome.prefix().starts_with(tag))?;
    let detail = captures.get(2)?.as_str();
    Some(ParsedLine { outcome, detail })
}

pub fn tally_log(log: &str) -> Tally {
    log.lines()
        .filter_map(parse_line)
        .fold(Tally::default(), |mut tally, line| {
            tally.add(line.outcome);
            tally
        })
}

pub struct LogSummary {
    pub tally: Tally,
    pub passed: bool, // No failing outcome in the log
}

pub async fn summarize_log_file(path: &Path) -> Result<LogSummary> {
    let log = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let tally = tally_log(&log);
    Ok(LogSummary {
        tally,
        passed: tally.all_passed(),
    })
}
