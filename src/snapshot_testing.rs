// Checking a replayed script's diagnostic log against its approved snapshot

use crate::script::approved_log_path;
use colored::{Color, Colorize};
use similar::{ChangeTag, TextDiff};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Unchanged log lines shown around each differing hunk
const CONTEXT_LINES: usize = 2;

pub struct LogMismatch {
    pub script_path: PathBuf,
    pub approved_path: PathBuf,
    pub actual: Arc<str>,
    pub approved: std::io::Result<String>,
}

struct LineNumber(Option<usize>);

impl Display for LineNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.0 {
            None => write!(f, "    "),
            Some(idx) => write!(f, "{:<4}", idx + 1),
        }
    }
}

fn fmt_log_hunks(f: &mut std::fmt::Formatter<'_>, approved: &str, actual: &str) -> std::fmt::Result {
    let diff = TextDiff::from_lines(approved, actual);

    for (hunk, ops) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
        if hunk > 0 {
            writeln!(f, "{}", "    ...".dimmed())?;
        }
        for op in ops {
            for change in diff.iter_changes(op) {
                let (sign, color) = match change.tag() {
                    ChangeTag::Delete => ("-", Some(Color::Red)),
                    ChangeTag::Insert => ("+", Some(Color::Green)),
                    ChangeTag::Equal => (" ", None),
                };
                write!(
                    f,
                    "{} {} |",
                    LineNumber(change.old_index()),
                    LineNumber(change.new_index())
                )?;

                let line = format!("{sign}{change}");
                match color {
                    Some(c) => write!(f, "{}", line.color(c))?,
                    None => write!(f, "{line}")?,
                }
                if change.missing_newline() {
                    writeln!(f)?;
                }
            }
        }
    }

    Ok(())
}

impl Display for LogMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.script_path.display();
        match &self.approved {
            Ok(approved) => {
                writeln!(
                    f,
                    "log of {script} differs from {}",
                    self.approved_path.display()
                )?;
                fmt_log_hunks(f, approved, &self.actual)
            }
            Err(err) => {
                writeln!(
                    f,
                    "no approved log for {script} at {}: {err}",
                    self.approved_path.display()
                )?;
                fmt_log_hunks(f, "", &self.actual)
            }
        }
    }
}

impl LogMismatch {
    pub async fn approve(&self) -> std::io::Result<()> {
        tokio::fs::write(&self.approved_path, self.actual.as_bytes()).await
    }
}

pub async fn log_matches_snapshot(actual: Arc<str>, script_path: &Path) -> Result<(), LogMismatch> {
    let approved_path = approved_log_path(script_path);
    let approved = tokio::fs::read_to_string(&approved_path).await;

    if approved
        .as_ref()
        .is_ok_and(|approved| approved == actual.as_ref())
    {
        Ok(())
    } else {
        Err(LogMismatch {
            script_path: script_path.to_path_buf(),
            approved_path,
            actual,
            approved,
        })
    }
}
