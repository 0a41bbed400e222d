//! Console aggregator
//!
//! Stateful view over the relayed console records: accumulates in arrival
//! order, auto-expands on the first error, exposes derived badge counts,
//! and keeps collection bounded.

use crate::types::{ConsoleKind, ConsoleRecord};

/// Ordered, bounded collection of console records.
#[derive(Debug)]
pub struct ConsoleAggregator {
    records: Vec<ConsoleRecord>,
    expanded: bool,
    truncated: bool,
    max_records: usize,
}

impl ConsoleAggregator {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            expanded: false,
            truncated: false,
            max_records,
        }
    }

    /// Append one record. The panel auto-expands the first time an error
    /// record arrives and never auto-collapses afterwards.
    pub fn push(&mut self, record: ConsoleRecord) {
        if self.records.len() >= self.max_records {
            if !self.truncated {
                self.truncated = true;
                log::warn!(
                    "console record limit ({}) reached, discarding further records",
                    self.max_records
                );
            }
            return;
        }
        if record.kind == ConsoleKind::Error {
            self.expanded = true;
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[ConsoleRecord] {
        &self.records
    }

    pub fn expanded(&self) -> bool {
        self.expanded
    }

    /// Explicit user action; the only way the panel collapses again.
    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Derived, not stored.
    pub fn error_count(&self) -> usize {
        self.count(ConsoleKind::Error)
    }

    /// Derived, not stored.
    pub fn warn_count(&self) -> usize {
        self.count(ConsoleKind::Warn)
    }

    fn count(&self, kind: ConsoleKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Empty the record list. Orthogonal to the preview surface and the
    /// error banner: clearing the log never clears a failed render.
    pub fn clear(&mut self) {
        self.records.clear();
        self.truncated = false;
    }
}
