//! Run report model, mutable report builder and run events.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{EnumItemKind, SpecCopyError};

/// Aggregate counters and diagnostics for one run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportRun {
    /// Number of enumerated files that passed the filter.
    pub cnt_matched: u64,
    /// Number of files written to the destination.
    pub cnt_copied: u64,
    /// Number of files left alone because the target existed.
    pub cnt_skipped: u64,
    /// Number of files whose directory creation or copy failed.
    pub cnt_failed: u64,
    /// Run ended early on a cancellation request.
    pub if_stopped: bool,
    /// Human-readable summary.
    pub message: String,
    /// Non-fatal warnings collected during enumeration/copy.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecCopyError>,
}

impl ReportRun {
    /// Number of entries that reached an outcome.
    pub fn processed_count(&self) -> u64 {
        self.cnt_copied + self.cnt_skipped + self.cnt_failed
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_failed".to_string(), self.cnt_failed);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// One-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} matched={} copied={} skipped={} failed={} stopped={}",
            self.cnt_matched, self.cnt_copied, self.cnt_skipped, self.cnt_failed, self.if_stopped
        )
    }
}

impl fmt::Display for ReportRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[RUN]"))
    }
}

/// Mutable accumulator for run statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportRunBuilder {
    /// See [`ReportRun::cnt_matched`].
    pub cnt_matched: u64,
    /// See [`ReportRun::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportRun::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportRun::cnt_failed`].
    pub cnt_failed: u64,
    /// See [`ReportRun::if_stopped`].
    pub if_stopped: bool,
    /// See [`ReportRun::errors`].
    pub errors: Vec<SpecCopyError>,
}

impl ReportRunBuilder {
    pub fn with_matched(cnt_matched: u64) -> Self {
        Self {
            cnt_matched,
            ..Self::default()
        }
    }

    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Count one failed entry and keep its cause.
    pub fn add_failed(&mut self, path: PathBuf, exception: String) {
        self.cnt_failed += 1;
        self.errors.push(SpecCopyError { path, exception });
    }

    pub fn mark_stopped(&mut self) {
        self.if_stopped = true;
    }

    /// Finalize builder into immutable report, composing the summary text.
    pub fn build(self) -> ReportRun {
        let message = if self.cnt_matched == 0 {
            "No qualifying files found".to_string()
        } else if self.if_stopped {
            format!(
                "Stopped. Copied {}, skipped {}, failed {}",
                self.cnt_copied, self.cnt_skipped, self.cnt_failed
            )
        } else {
            format!(
                "Done. Processed {} files\nCopied: {}\nSkipped: {}\nFailed: {}",
                self.cnt_matched, self.cnt_copied, self.cnt_skipped, self.cnt_failed
            )
        };

        ReportRun {
            cnt_matched: self.cnt_matched,
            cnt_copied: self.cnt_copied,
            cnt_skipped: self.cnt_skipped,
            cnt_failed: self.cnt_failed,
            if_stopped: self.if_stopped,
            message,
            warnings: Vec::new(),
            errors: self.errors,
        }
    }
}

/// Immutable event emitted by a run, in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecRunEvent {
    /// About to process entry `n_index` (1-based) of `n_total`.
    Progress {
        n_index: usize,
        n_total: usize,
        /// `n_index / n_total * 100`.
        percent: f64,
        /// Status line, e.g. `Copying 3/10`.
        status: String,
    },
    /// Outcome of one entry.
    Item {
        kind: EnumItemKind,
        name_file: String,
        detail: String,
    },
    /// Run ended; always the last event of a started run.
    Finished(ReportRun),
    /// Run never started; always the last event of a rejected run.
    Failed(String),
}
