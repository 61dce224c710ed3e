use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{SettingsEvent, SettingsHub};
use crate::editor;
use crate::error::{Result, WarnError};
use crate::filter::FilterEngine;
use crate::warning::{FsLogSource, LoadFinished, LogSource, Warning, WarningStore, load_store};

/// Why a successfully loaded log is not shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    NoWarnings,
    /// Every category was filtered out by the allow-pattern
    NoAvailableCategories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(usize),
    AlreadyOpen(usize),
    Reloaded(usize),
    Hidden(HiddenReason),
}

/// A loaded log with its own filter state
pub struct LogSession {
    path: PathBuf,
    engine: FilterEngine,
}

impl LogSession {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for display, falling back to the full path
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut FilterEngine {
        &mut self.engine
    }
}

/// Every log the user has opened, plus the settings they share
pub struct Workspace {
    settings: SettingsHub,
    source: Arc<dyn LogSource>,
    /// Paths in the order they were opened, shown or not
    requested: Vec<PathBuf>,
    sessions: Vec<LogSession>,
    current: Option<usize>,
    /// Text filter applied to whichever session is current
    text_filter: String,
}

impl Workspace {
    pub fn new(settings: SettingsHub) -> Self {
        Self::with_source(settings, Arc::new(FsLogSource))
    }

    pub fn with_source(settings: SettingsHub, source: Arc<dyn LogSource>) -> Self {
        Self {
            settings,
            source,
            requested: Vec::new(),
            sessions: Vec::new(),
            current: None,
            text_filter: String::new(),
        }
    }

    pub fn settings(&self) -> &SettingsHub {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsHub {
        &mut self.settings
    }

    pub fn sessions(&self) -> &[LogSession] {
        &self.sessions
    }

    pub fn session_index(&self, path: &Path) -> Option<usize> {
        self.sessions.iter().position(|s| s.path == path)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&LogSession> {
        self.current.and_then(|index| self.sessions.get(index))
    }

    pub fn current_mut(&mut self) -> Option<&mut LogSession> {
        self.current.and_then(|index| self.sessions.get_mut(index))
    }

    /// Switch sessions, carrying the text filter over and picking a
    /// category if none is selected yet
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.sessions.len() {
            return false;
        }
        self.current = Some(index);
        let needle = self.text_filter.clone();
        if let Some(session) = self.current_mut() {
            session.engine.set_text_needle(&needle);
        }
        if self
            .current()
            .is_some_and(|s| s.engine.state().accepted_categories().is_empty())
        {
            self.select_first_category();
        }
        true
    }

    /// Open a log. The source is checked before anything is parsed, and a log
    /// with nothing to show never becomes a session.
    pub fn open_log(&mut self, path: impl Into<PathBuf>) -> Result<OpenOutcome> {
        let path = path.into();
        self.source.check(&path)?;

        if let Some(index) = self.session_index(&path) {
            return Ok(OpenOutcome::AlreadyOpen(index));
        }
        if !self.requested.contains(&path) {
            self.requested.push(path.clone());
        }

        let (store, finished) = load_store(self.source.as_ref(), &path)?;
        self.install(path, store, finished)
    }

    /// Remember a log that will be loaded elsewhere (e.g. in the background).
    /// The source check still happens up front.
    pub fn track(&mut self, path: &Path) -> Result<()> {
        self.source.check(path)?;
        if !self.requested.iter().any(|p| p == path) {
            self.requested.push(path.to_path_buf());
        }
        Ok(())
    }

    /// Attach a finished load, either replacing an existing session's store
    /// or creating a new session
    pub fn install(
        &mut self,
        path: PathBuf,
        store: WarningStore,
        finished: LoadFinished,
    ) -> Result<OpenOutcome> {
        let store = Arc::new(store);

        if let Some(index) = self.session_index(&path) {
            let engine = &mut self.sessions[index].engine;
            engine.replace_store(store);
            engine.on_load_finished(&finished);
            if let Some(reason) = hidden_reason(engine) {
                tracing::info!(path = %path.display(), ?reason, "log no longer has anything to show");
                self.remove_session(index);
                return Ok(OpenOutcome::Hidden(reason));
            }
            return Ok(OpenOutcome::Reloaded(index));
        }

        // A new engine computes its available categories on construction
        let engine = FilterEngine::new(store, &self.settings.settings().category_filter_regexp)?;
        if let Some(reason) = hidden_reason(&engine) {
            tracing::info!(path = %path.display(), ?reason, "log not shown");
            return Ok(OpenOutcome::Hidden(reason));
        }

        tracing::info!(
            path = %path.display(),
            warnings = finished.record_count,
            categories = engine.available_categories().len(),
            "log opened"
        );
        self.sessions.push(LogSession { path, engine });
        let index = self.sessions.len() - 1;
        self.set_current(index);
        Ok(OpenOutcome::Opened(index))
    }

    /// Re-parse one log from its source. On failure the previous store, if
    /// any, stays in place.
    pub fn reload_log(&mut self, path: &Path) -> Result<OpenOutcome> {
        let (store, finished) = load_store(self.source.as_ref(), path)?;
        self.install(path.to_path_buf(), store, finished)
    }

    /// Re-parse every requested log, including ones that were hidden
    pub fn reload_all(&mut self) {
        let current_path = self.current().map(|s| s.path.clone());

        for path in self.requested.clone() {
            if let Err(e) = self.reload_log(&path) {
                tracing::warn!(path = %path.display(), error = %e, "reload failed, keeping previous warnings");
            }
        }
        self.prune_hidden();

        let index = current_path
            .and_then(|path| self.session_index(&path))
            .or_else(|| self.sessions.len().checked_sub(1));
        if let Some(index) = index {
            self.set_current(index);
        } else {
            self.current = None;
        }
    }

    pub fn close_log(&mut self, index: usize) -> bool {
        if index >= self.sessions.len() {
            return false;
        }
        let path = self.sessions[index].path.clone();
        self.requested.retain(|p| p != &path);
        self.remove_session(index);
        true
    }

    /// Change the allow-pattern and reload every log against it
    pub fn set_category_filter_regexp(&mut self, pattern: &str) -> anyhow::Result<bool> {
        if !self.settings.set_category_filter_regexp(pattern)? {
            return Ok(false);
        }
        self.apply_category_pattern()?;
        Ok(true)
    }

    /// React to a settings change that happened elsewhere (e.g. on disk)
    pub fn apply_settings_event(&mut self, event: &SettingsEvent) -> Result<()> {
        match event {
            SettingsEvent::CategoryFilterRegexpChanged(_) => self.apply_category_pattern(),
            SettingsEvent::ExternalEditorChanged(_) => Ok(()),
        }
    }

    fn apply_category_pattern(&mut self) -> Result<()> {
        self.sync_category_pattern()?;
        self.reload_all();
        Ok(())
    }

    /// Push the settings' allow-pattern into every session without reading
    /// any log, dropping sessions left with no available category. Returns
    /// every requested log, which the caller is expected to reload (hidden
    /// logs may qualify again under the new pattern).
    pub fn sync_category_pattern(&mut self) -> Result<Vec<PathBuf>> {
        let pattern = self.settings.settings().category_filter_regexp.clone();
        for session in &mut self.sessions {
            session.engine.set_category_allow_pattern(&pattern)?;
        }
        self.prune_hidden();
        if let Some(index) = self.current {
            self.set_current(index);
        }
        Ok(self.requested.clone())
    }

    pub fn select_all_categories(&mut self) -> bool {
        match self.current_mut() {
            Some(session) => {
                let all = session.engine.available_categories().iter().cloned().collect();
                session.engine.set_accepted_categories(all)
            }
            None => false,
        }
    }

    pub fn unselect_all_categories(&mut self) -> bool {
        match self.current_mut() {
            Some(session) => session.engine.set_accepted_categories(HashSet::new()),
            None => false,
        }
    }

    /// Select only the first available category (in sorted order)
    pub fn select_first_category(&mut self) -> bool {
        let Some(session) = self.current_mut() else {
            return false;
        };
        let Some(first) = session.engine.available_categories().iter().next().cloned() else {
            return false;
        };
        session.engine.set_accepted_categories(HashSet::from([first]))
    }

    pub fn select_categories<I, S>(&mut self, categories: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: HashSet<String> = categories.into_iter().map(Into::into).collect();
        match self.current_mut() {
            Some(session) => session.engine.set_accepted_categories(categories),
            None => false,
        }
    }

    pub fn filter_by_text(&mut self, text: &str) -> bool {
        self.text_filter = text.to_string();
        match self.current_mut() {
            Some(session) => session.engine.set_text_needle(text),
            None => false,
        }
    }

    pub fn status_message(&self) -> Option<String> {
        self.current()
            .map(|s| format!("showing {} warnings", s.engine.visible_count()))
    }

    /// Editor command for the visible warning at `index` in the current session
    pub fn editor_command(&self, index: usize) -> Result<String> {
        let warn = self.visible_warning(index)?;
        editor::editor_command(&self.settings.settings().external_editor, warn, index)
    }

    pub fn visible_warning(&self, index: usize) -> Result<&Warning> {
        self.current()
            .and_then(|s| s.engine.visible_records().get(index).copied())
            .ok_or(WarnError::NoSuchWarning(index))
    }

    fn prune_hidden(&mut self) {
        let mut index = 0;
        while index < self.sessions.len() {
            if hidden_reason(&self.sessions[index].engine).is_some() {
                self.remove_session(index);
            } else {
                index += 1;
            }
        }
    }

    fn remove_session(&mut self, index: usize) {
        self.sessions.remove(index);
        self.current = match self.current {
            _ if self.sessions.is_empty() => None,
            Some(current) if current == index => Some(index.min(self.sessions.len() - 1)),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
    }
}

fn hidden_reason(engine: &FilterEngine) -> Option<HiddenReason> {
    if engine.store().is_empty() {
        Some(HiddenReason::NoWarnings)
    } else if engine.available_categories().is_empty() {
        Some(HiddenReason::NoAvailableCategories)
    } else {
        None
    }
}
