use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::SkipReason;
use crate::shared::NoteId;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WrittenNote {
    pub position: usize,
    pub note: NoteId,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedNote {
    pub position: usize,
    pub note: NoteId,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedNote {
    pub position: usize,
    pub note: NoteId,
    pub sample: PathBuf,
    pub message: String,
}

/// What happened over one run. Returned for every outcome that isn't fatal,
/// cancelled runs included.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub written: Vec<WrittenNote>,
    pub skipped: Vec<SkippedNote>,
    pub failed: Vec<FailedNote>,
    pub cancelled: bool,
    pub chromatic: Option<PathBuf>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty() && !self.cancelled
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} written, {} skipped, {} failed{}",
            self.written.len(),
            self.skipped.len(),
            self.failed.len(),
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        for s in &self.skipped {
            writeln!(f, "  skipped #{:<3} {:<4} {}", s.position, s.note, s.reason.as_str())?;
        }
        for x in &self.failed {
            writeln!(f, "  failed  #{:<3} {:<4} {}", x.position, x.note, x.message)?;
        }
        if let Some(path) = &self.chromatic {
            writeln!(f, "  chromatic scale: {}", path.display())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    Written,
    Skipped,
    Failed,
}

impl ItemOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemOutcome::Written => "written",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::Failed => "failed",
        }
    }
}

// Sent after each item finishes
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub index: usize,
    pub total: usize,
    pub note: NoteId,
    pub outcome: ItemOutcome,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {} {}", self.index + 1, self.total, self.note, self.outcome.as_str())
    }
}
