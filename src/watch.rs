use anyhow::{Context, Result};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::SettingsEvent;
use crate::warning::{FsLogSource, LoadEvent, LogLoader};
use crate::workspace::{OpenOutcome, Workspace};

/// Something on disk that the workspace depends on has changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    LogChanged(PathBuf),
    SettingsChanged,
}

/// Watches log files and the settings file using OS-level notifications.
/// Parent directories are watched so that files replaced by editors or
/// recreated by build tools are still picked up.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
}

impl ChangeWatcher {
    pub fn start(
        logs: &[PathBuf],
        settings_path: Option<&Path>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let logs: HashSet<PathBuf> = logs.iter().map(|p| absolute(p)).collect();
        let settings_path = settings_path.map(absolute);

        let mut dirs: HashSet<PathBuf> = logs.iter().filter_map(|p| parent_dir(p)).collect();
        if let Some(dir) = settings_path.as_deref().and_then(parent_dir) {
            dirs.insert(dir);
        }

        let watched_logs = logs.clone();
        let watched_settings = settings_path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                let Ok(event) = res else {
                    return;
                };
                if !matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in &event.paths {
                    if watched_logs.contains(path) {
                        let _ = tx.send(WatchEvent::LogChanged(path.clone()));
                    } else if watched_settings.as_ref() == Some(path) {
                        let _ = tx.send(WatchEvent::SettingsChanged);
                    }
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        for dir in &dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
        }

        Ok((Self { _watcher: watcher }, rx))
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
}

/// Keep `workspace` in sync with the disk until Ctrl+C. Log parses run in
/// the background; a change arriving while its log is still loading is
/// queued and loaded once the running parse finishes.
pub async fn run_watch(workspace: &mut Workspace, logs: Vec<PathBuf>) -> Result<()> {
    let logs: Vec<PathBuf> = logs.iter().map(|p| absolute(p)).collect();
    let settings_path = workspace.settings().path().map(Path::to_path_buf);
    let (_watcher, mut changes) = ChangeWatcher::start(&logs, settings_path.as_deref())?;
    let (loader, mut loads) = LogLoader::new(Arc::new(FsLogSource));
    let mut queued: HashSet<PathBuf> = HashSet::new();

    for path in &logs {
        workspace.track(path)?;
        loader.request(path.clone());
    }

    loop {
        tokio::select! {
            Some(change) = changes.recv() => match change {
                WatchEvent::LogChanged(path) => request_load(&loader, &mut queued, path),
                WatchEvent::SettingsChanged => {
                    match workspace.settings_mut().reload_from_disk() {
                        Ok(events) => {
                            for event in &events {
                                // Logs are re-read in the background like any other change
                                if let SettingsEvent::CategoryFilterRegexpChanged(_) = event {
                                    for path in workspace.sync_category_pattern()? {
                                        request_load(&loader, &mut queued, path);
                                    }
                                }
                            }
                            if !events.is_empty() {
                                print_status(workspace);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "ignoring invalid settings file"),
                    }
                }
            },
            Some(load) = loads.recv() => {
                handle_load(workspace, load);
                queued.retain(|path| !loader.request(path.clone()));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Start a load, or queue it if one for the same path is still running
fn request_load(loader: &LogLoader, queued: &mut HashSet<PathBuf>, path: PathBuf) {
    if !loader.request(path.clone()) {
        queued.insert(path);
    }
}

fn handle_load(workspace: &mut Workspace, load: LoadEvent) {
    let LoadEvent { path, result } = load;
    match result {
        Ok((store, finished)) => match workspace.install(path.clone(), store, finished) {
            Ok(OpenOutcome::Hidden(reason)) => {
                println!("{}: nothing to show ({:?})", path.display(), reason);
            }
            Ok(_) => print_status(workspace),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not attach log"),
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "load failed, keeping previous warnings");
        }
    }
}

fn print_status(workspace: &Workspace) {
    for session in workspace.sessions() {
        let engine = session.engine();
        println!(
            "{}: {} warnings, {} categories, showing {}",
            session.title(),
            engine.store().record_count(),
            engine.available_categories().len(),
            engine.visible_count()
        );
    }
}
