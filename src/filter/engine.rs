use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::category::CategoryFilter;
use crate::error::Result;
use crate::warning::{LoadFinished, Warning, WarningStore};

/// Notifications sent to subscribers when the engine's output changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    /// A new store was attached; carries the new visible count
    StoreReplaced { visible: usize },
    /// Accepted categories or text needle changed
    FilterChanged { visible: usize },
    /// The available category vocabulary was recomputed
    AvailabilityChanged { available: usize },
}

/// User-chosen filter for one loaded log
#[derive(Debug, Default, Clone)]
pub struct FilterState {
    /// Empty means nothing is shown
    accepted_categories: HashSet<String>,
    text_needle: String,
    /// Pre-computed lowercase needle
    needle_lowercase: String,
}

impl FilterState {
    pub fn accepted_categories(&self) -> &HashSet<String> {
        &self.accepted_categories
    }

    pub fn text_needle(&self) -> &str {
        &self.text_needle
    }

    pub fn accepts(&self, warn: &Warning) -> bool {
        if self.accepted_categories.is_empty() {
            return false;
        }
        if !self.accepted_categories.contains(&warn.category) {
            return false;
        }
        self.needle_lowercase.is_empty() || warn.text_lowercase().contains(&self.needle_lowercase)
    }
}

/// Derives visible warnings and available categories for one store
pub struct FilterEngine {
    store: Arc<WarningStore>,
    state: FilterState,
    category_filter: CategoryFilter,
    available: BTreeSet<String>,
    /// Store indices of the visible warnings, in store order
    visible: Vec<usize>,
    subscribers: Vec<mpsc::UnboundedSender<FilterEvent>>,
}

impl FilterEngine {
    pub fn new(store: Arc<WarningStore>, allow_pattern: &str) -> Result<Self> {
        let category_filter = CategoryFilter::new(allow_pattern)?;
        let mut engine = Self {
            store,
            state: FilterState::default(),
            category_filter,
            available: BTreeSet::new(),
            visible: Vec::new(),
            subscribers: Vec::new(),
        };
        engine.calculate_available_categories();
        Ok(engine)
    }

    /// Register for change notifications
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<FilterEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn store(&self) -> &Arc<WarningStore> {
        &self.store
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn allow_pattern(&self) -> &str {
        self.category_filter.pattern()
    }

    pub fn available_categories(&self) -> &BTreeSet<String> {
        &self.available
    }

    pub fn visible_records(&self) -> Vec<&Warning> {
        self.visible
            .iter()
            .filter_map(|&index| self.store.get(index))
            .collect()
    }

    /// Store indices of the visible warnings
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Replace the accepted categories. Returns false (and does nothing) if
    /// the set is unchanged.
    pub fn set_accepted_categories(&mut self, categories: HashSet<String>) -> bool {
        if categories == self.state.accepted_categories {
            return false;
        }
        self.state.accepted_categories = categories;
        self.invalidate_filter();
        true
    }

    /// Replace the free-text needle. Returns false if unchanged.
    pub fn set_text_needle(&mut self, needle: &str) -> bool {
        if needle == self.state.text_needle {
            return false;
        }
        self.state.text_needle = needle.to_string();
        self.state.needle_lowercase = needle.to_lowercase();
        self.invalidate_filter();
        true
    }

    /// Replace the category allow-pattern. Returns Ok(false) if unchanged and
    /// Err if the pattern does not compile, leaving the old one in place.
    pub fn set_category_allow_pattern(&mut self, pattern: &str) -> Result<bool> {
        if pattern == self.category_filter.pattern() {
            return Ok(false);
        }
        self.category_filter = CategoryFilter::new(pattern)?;
        self.calculate_available_categories();
        Ok(true)
    }

    /// Attach a freshly loaded store, discarding the previous one. Available
    /// categories are recalculated when the store's load notification is
    /// delivered through `on_load_finished`.
    pub fn replace_store(&mut self, store: Arc<WarningStore>) {
        self.store = store;
        self.visible = self.compute_visible();
        self.notify(FilterEvent::StoreReplaced {
            visible: self.visible.len(),
        });
    }

    /// React to the attached store's load notification. This is the only
    /// place a load updates the available categories.
    pub fn on_load_finished(&mut self, finished: &LoadFinished) {
        if finished.is_success() && finished.source == self.store.source_identifier() {
            self.calculate_available_categories();
        }
    }

    fn invalidate_filter(&mut self) {
        self.visible = self.compute_visible();
        tracing::debug!(
            source = %self.store.source_identifier(),
            visible = self.visible.len(),
            "filter invalidated"
        );
        self.notify(FilterEvent::FilterChanged {
            visible: self.visible.len(),
        });
    }

    fn compute_visible(&self) -> Vec<usize> {
        if self.state.accepted_categories.is_empty() {
            return Vec::new();
        }
        self.store
            .records()
            .iter()
            .enumerate()
            .filter(|(_, warn)| self.state.accepts(warn))
            .map(|(index, _)| index)
            .collect()
    }

    fn calculate_available_categories(&mut self) {
        self.available = self
            .store
            .records()
            .iter()
            .filter(|warn| self.category_filter.is_allowed(&warn.category))
            .map(|warn| warn.category.clone())
            .collect();
        tracing::debug!(
            source = %self.store.source_identifier(),
            available = self.available.len(),
            "available categories recalculated"
        );
        self.notify(FilterEvent::AvailabilityChanged {
            available: self.available.len(),
        });
    }

    fn notify(&mut self, event: FilterEvent) {
        // Drop subscribers whose receiver has gone away
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
