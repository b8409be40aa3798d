// What a run would do, for display before anything is written
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::resolver::Resolution;
use crate::shared::Symbol;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub position: usize,
    pub note: String,
    pub token: Option<Symbol>,
    pub sample: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PreviewReport {
    pub items: Vec<PreviewItem>,
    pub warnings: Vec<String>,
}

impl PreviewReport {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let items = resolution
            .assignments
            .iter()
            .map(|a| PreviewItem {
                position: a.position,
                note: a.note.label(),
                token: a.token,
                sample: a.sample.clone(),
                reason: a.skip.map(|r| r.as_str()),
            })
            .collect();
        let warnings = resolution.warnings.iter().map(ToString::to_string).collect();
        Self { items, warnings }
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|i| i.sample.is_none()).count()
    }
}

impl fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            let token = item.token.map(|t| t.as_str()).unwrap_or("#");
            let sample = match (&item.sample, item.reason) {
                (Some(path), _) => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                (None, reason) => format!("(none: {})", reason.unwrap_or("skipped")),
            };
            writeln!(f, "{:>4}  {:<4} {:<3} {}", item.position + 1, item.note, token, sample)?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        write!(f, "{} note(s), {} skipped", self.items.len(), self.skipped())
    }
}
