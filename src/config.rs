use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::filter::CategoryFilter;

pub const DEFAULT_CONFIG_PATH: &str = ".warnview.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Regex over category names; only matching categories are offered
    #[serde(default)]
    pub category_filter_regexp: String,
    /// Command template with $filename, $line and $column placeholders
    #[serde(default)]
    pub external_editor: String,
    /// Logs to open when none are given on the command line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<PathBuf>,
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Like `from_file`, but a missing file yields the defaults
    pub fn from_file_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Err(e) = CategoryFilter::new(&self.category_filter_regexp) {
            anyhow::bail!(
                "category_filter_regexp '{}' is not a valid regex: {}",
                self.category_filter_regexp,
                e
            );
        }

        if !self.external_editor.is_empty() && !self.external_editor.contains("$filename") {
            anyhow::bail!(
                "external_editor '{}' must contain the $filename placeholder",
                self.external_editor
            );
        }

        Ok(())
    }
}

/// Emitted by `SettingsHub` when a field actually changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    CategoryFilterRegexpChanged(String),
    ExternalEditorChanged(String),
}

/// Process-wide settings with explicit load, update and subscribe
#[derive(Debug, Default)]
pub struct SettingsHub {
    settings: Settings,
    path: Option<PathBuf>,
    subscribers: Vec<mpsc::UnboundedSender<SettingsEvent>>,
}

impl SettingsHub {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            path: None,
            subscribers: Vec::new(),
        }
    }

    /// Load from `path` (defaults if missing) and remember it for saving
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let settings = Settings::from_file_or_default(&path)?;
        settings.validate()?;
        Ok(Self {
            settings,
            path: Some(path),
            subscribers: Vec::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SettingsEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Returns Ok(false) when the value is unchanged
    pub fn set_category_filter_regexp(&mut self, pattern: &str) -> anyhow::Result<bool> {
        if pattern == self.settings.category_filter_regexp {
            return Ok(false);
        }
        CategoryFilter::new(pattern)?;
        self.settings.category_filter_regexp = pattern.to_string();
        tracing::info!(pattern, "category filter regexp changed");
        self.notify(SettingsEvent::CategoryFilterRegexpChanged(pattern.to_string()));
        Ok(true)
    }

    pub fn set_external_editor(&mut self, editor: &str) -> bool {
        if editor == self.settings.external_editor {
            return false;
        }
        self.settings.external_editor = editor.to_string();
        self.notify(SettingsEvent::ExternalEditorChanged(editor.to_string()));
        true
    }

    /// Apply a whole new settings value, notifying once per changed field
    pub fn update(&mut self, settings: Settings) -> anyhow::Result<Vec<SettingsEvent>> {
        settings.validate()?;
        let mut events = Vec::new();

        if settings.category_filter_regexp != self.settings.category_filter_regexp {
            events.push(SettingsEvent::CategoryFilterRegexpChanged(
                settings.category_filter_regexp.clone(),
            ));
        }
        if settings.external_editor != self.settings.external_editor {
            events.push(SettingsEvent::ExternalEditorChanged(
                settings.external_editor.clone(),
            ));
        }

        self.settings = settings;
        for event in &events {
            self.notify(event.clone());
        }
        Ok(events)
    }

    /// Re-read the backing file after it was edited externally
    pub fn reload_from_disk(&mut self) -> anyhow::Result<Vec<SettingsEvent>> {
        let Some(path) = self.path.clone() else {
            return Ok(Vec::new());
        };
        let settings = Settings::from_file_or_default(&path)?;
        self.update(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.path {
            Some(path) => self.settings.save(path),
            None => anyhow::bail!("settings have no backing file"),
        }
    }

    fn notify(&mut self, event: SettingsEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
