use super::Warning;
use super::parser::{ParseOutcome, ParseResult};
use std::collections::{BTreeMap, BTreeSet};

/// One-shot notification produced when a store finishes loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFinished {
    pub source: String,
    pub outcome: ParseOutcome,
    pub record_count: usize,
}

impl LoadFinished {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Immutable, ordered warnings of one loaded log
#[derive(Debug)]
pub struct WarningStore {
    source: String,
    warnings: Vec<Warning>,
    outcome: ParseOutcome,
}

impl WarningStore {
    /// Build a store from a finished parse. The returned event is the only
    /// load notification this store will ever produce.
    pub fn load(source: impl Into<String>, result: ParseResult) -> (Self, LoadFinished) {
        let source = source.into();
        let store = Self {
            source: source.clone(),
            warnings: result.warnings,
            outcome: result.outcome,
        };
        tracing::debug!(source = %store.source, count = store.warnings.len(), "warning store loaded");

        let finished = LoadFinished {
            source,
            outcome: store.outcome.clone(),
            record_count: store.warnings.len(),
        };
        (store, finished)
    }

    pub fn records(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn get(&self, index: usize) -> Option<&Warning> {
        self.warnings.get(index)
    }

    pub fn record_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn source_identifier(&self) -> &str {
        &self.source
    }

    pub fn outcome(&self) -> &ParseOutcome {
        &self.outcome
    }

    /// Every distinct category, before any allow-pattern is applied
    pub fn categories(&self) -> BTreeSet<&str> {
        self.warnings.iter().map(|w| w.category.as_str()).collect()
    }

    /// Number of warnings per category
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for warn in &self.warnings {
            *counts.entry(warn.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
