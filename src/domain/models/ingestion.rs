use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Terminal state of a single candidate URL within an ingestion run.
#[derive(Debug)]
pub enum CandidateOutcome {
    /// Described and appended to the index.
    Stored,
    /// Already present in the index.
    DedupSkip,
    /// Downloaded payload was too small to be a real image.
    SizeSkip { bytes: usize },
    DownloadFailed(DomainError),
    DescribeFailed(DomainError),
    /// The description was produced but the index refused it.
    StoreFailed(DomainError),
}

impl CandidateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CandidateOutcome::Stored => "stored",
            CandidateOutcome::DedupSkip => "dedup_skip",
            CandidateOutcome::SizeSkip { .. } => "size_skip",
            CandidateOutcome::DownloadFailed(_) => "download_failed",
            CandidateOutcome::DescribeFailed(_) => "describe_failed",
            CandidateOutcome::StoreFailed(_) => "store_failed",
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            CandidateOutcome::DedupSkip | CandidateOutcome::SizeSkip { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CandidateOutcome::DownloadFailed(_)
                | CandidateOutcome::DescribeFailed(_)
                | CandidateOutcome::StoreFailed(_)
        )
    }
}

/// Tally of one ingestion run. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &CandidateOutcome) {
        match outcome {
            CandidateOutcome::Stored => self.stored += 1,
            o if o.is_skip() => self.skipped += 1,
            _ => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ingestion complete. Analyzed: {}, Skipped: {}",
            self.stored, self.skipped
        )
    }
}
