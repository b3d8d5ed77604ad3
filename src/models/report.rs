use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// What happened to a single link during a fetch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOutcome {
    Downloaded {
        path: PathBuf,
        token: Option<String>,
    },
    /// Cached with a non-empty change token, not requested.
    Fresh,
    /// No bank name could be inferred from the surrounding markup.
    Unresolved { reason: String },
    /// The same locator appeared earlier on the page.
    Duplicate,
    Failed { reason: String },
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Downloaded { path, .. } => write!(f, "downloaded to {}", path.display()),
            FetchOutcome::Fresh => write!(f, "fresh"),
            FetchOutcome::Unresolved { reason } => write!(f, "unresolved: {}", reason),
            FetchOutcome::Duplicate => write!(f, "duplicate"),
            FetchOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub index: usize,
    pub locator: String,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchReport {
    pub links: Vec<LinkReport>,
}

impl FetchReport {
    pub fn push(&mut self, index: usize, locator: impl Into<String>, outcome: FetchOutcome) {
        self.links.push(LinkReport {
            index,
            locator: locator.into(),
            outcome,
        });
    }

    pub fn extend(&mut self, reports: impl IntoIterator<Item = LinkReport>) {
        self.links.extend(reports);
    }

    /// Puts entries back into document order after concurrent collection.
    pub fn sort(&mut self) {
        self.links.sort_by_key(|report| report.index);
    }

    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, FetchOutcome::Downloaded { .. }))
    }

    pub fn fresh(&self) -> usize {
        self.count(|outcome| matches!(outcome, FetchOutcome::Fresh))
    }

    pub fn unresolved(&self) -> usize {
        self.count(|outcome| matches!(outcome, FetchOutcome::Unresolved { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|outcome| matches!(outcome, FetchOutcome::Duplicate))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FetchOutcome::Failed { .. }))
    }

    pub fn outcome_for(&self, locator: &str) -> Option<&FetchOutcome> {
        self.links
            .iter()
            .find(|report| report.locator == locator)
            .map(|report| &report.outcome)
    }

    fn count(&self, predicate: impl Fn(&FetchOutcome) -> bool) -> usize {
        self.links.iter().filter(|report| predicate(&report.outcome)).count()
    }

    pub fn log_summary(&self) {
        info!(
            "Fetch complete: {} links, {} downloaded, {} fresh, {} unresolved, {} duplicate, {} failed",
            self.links.len(),
            self.downloaded(),
            self.fresh(),
            self.unresolved(),
            self.duplicates(),
            self.failed()
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertReport {
    pub outputs: Vec<PathBuf>,
    pub records: u64,
}

impl ConvertReport {
    pub fn log_summary(&self) {
        info!(
            "Conversion complete: {} files, {} records",
            self.outputs.len(),
            self.records
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanReport {
    pub files: usize,
    pub records: u64,
    pub skipped: u64,
}

impl CleanReport {
    pub fn absorb(&mut self, other: CleanReport) {
        self.files += other.files;
        self.records += other.records;
        self.skipped += other.skipped;
    }

    pub fn log_summary(&self) {
        info!(
            "Cleaning complete: {} files, {} records written, {} short records skipped",
            self.files, self.records, self.skipped
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    pub inputs: Vec<PathBuf>,
    pub rows: u64,
}

impl MergeReport {
    pub fn log_summary(&self) {
        info!(
            "Merge complete: {} files, {} rows",
            self.inputs.len(),
            self.rows
        );
    }
}
