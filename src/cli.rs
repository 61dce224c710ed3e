use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use warnview::config::{DEFAULT_CONFIG_PATH, Settings, SettingsHub};
use warnview::render;
use warnview::watch;
use warnview::workspace::{HiddenReason, OpenOutcome, Workspace};

/// warnview - compiler warning browser
#[derive(Parser, Debug)]
#[command(name = "wv")]
#[command(version)]
#[command(about = "Browse and filter compiler warnings from build logs")]
#[command(long_about = "warnview (wv) extracts warnings from GCC/Clang style build logs and lets you
filter them by category and by text.

A warning header looks like:
  path/to/file.cpp:12:5: warning: message [-Wcategory]
Every following line up to the next header (notes, code excerpts, carets) is
kept as part of that warning.

Quick start:
  1. Run 'wv --init' to create .warnview.toml
  2. Run 'wv categories build.log' to see which categories are present
  3. Run 'wv list build.log --category -Wshadow' to read them")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Initialize a new config file
    #[arg(long)]
    pub init: bool,

    /// Override the category filter regexp for this run
    #[arg(long)]
    pub category_filter: Option<String>,

    /// Enable debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Category and text selection shared by the commands that show warnings
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Selection {
    /// Show warnings of this category (repeatable). Defaults to the first
    /// available category.
    #[arg(long = "category", allow_hyphen_values = true)]
    pub categories: Vec<String>,

    /// Show every available category
    #[arg(long, conflicts_with = "categories")]
    pub all: bool,

    /// Only show warnings whose text contains this (case-insensitive)
    #[arg(short, long)]
    pub text: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the available categories of each log with their counts
    Categories {
        /// Log files (defaults to `logs` in the config file)
        logs: Vec<PathBuf>,
    },
    /// Print the warnings that pass the current filter
    List {
        /// Log files (defaults to `logs` in the config file)
        logs: Vec<PathBuf>,
        #[command(flatten)]
        selection: Selection,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Include notes and code excerpts below each warning
        #[arg(long)]
        full: bool,
    },
    /// Print the external editor command for a listed warning
    Edit {
        log: PathBuf,
        /// Index as shown by `wv list` with the same selection
        index: usize,
        #[command(flatten)]
        selection: Selection,
    },
    /// Keep watching logs and the config file, re-parsing on change
    Watch {
        /// Log files (defaults to `logs` in the config file)
        logs: Vec<PathBuf>,
    },
}

/// Initialize a new config file with defaults
pub fn init_config(config_path: &str) -> anyhow::Result<()> {
    if Path::new(config_path).exists() {
        println!("Config file '{}' already exists.", config_path);
        return Ok(());
    }

    let settings = Settings {
        category_filter_regexp: String::new(),
        external_editor: "code -g $filename:$line:$column".to_string(),
        logs: Vec::new(),
    };
    settings
        .save(config_path)
        .with_context(|| format!("Failed to write config to '{}'", config_path))?;

    use std::fs::OpenOptions;
    use std::io::Write;
    let mut file = OpenOptions::new()
        .append(true)
        .open(config_path)
        .with_context(|| format!("Failed to append to '{}'", config_path))?;
    writeln!(file, "\n# Logs to open when none are given on the command line")?;
    writeln!(file, "# logs = [\"build.log\"]")?;

    println!("Created {}", config_path);
    println!("\nNext steps:");
    println!("  1. Set category_filter_regexp to narrow the categories (e.g. \"^-Wclazy\")");
    println!("  2. Run 'wv categories <log>'");

    Ok(())
}

/// Build the workspace from the config file and CLI overrides
pub fn load_workspace(cli: &Cli) -> anyhow::Result<Workspace> {
    let mut hub = SettingsHub::load(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config))?;
    if let Some(pattern) = &cli.category_filter {
        hub.set_category_filter_regexp(pattern)
            .with_context(|| format!("Invalid --category-filter '{}'", pattern))?;
    }
    Ok(Workspace::new(hub))
}

fn resolve_logs(workspace: &Workspace, logs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    if !logs.is_empty() {
        return Ok(logs.to_vec());
    }
    let configured = &workspace.settings().settings().logs;
    if configured.is_empty() {
        return Err(anyhow!(
            "No log files given.\n\
             Pass them on the command line or set `logs` in the config file."
        ));
    }
    Ok(configured.clone())
}

/// Open every log, reporting the ones that end up with nothing to show.
/// Returns the paths that became sessions.
pub fn open_logs(workspace: &mut Workspace, logs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut opened = Vec::new();
    for path in logs {
        match workspace.open_log(path)? {
            OpenOutcome::Opened(_) | OpenOutcome::AlreadyOpen(_) | OpenOutcome::Reloaded(_) => {
                opened.push(path.clone());
            }
            OpenOutcome::Hidden(HiddenReason::NoWarnings) => {
                eprintln!("{}: no warnings found", path.display());
            }
            OpenOutcome::Hidden(HiddenReason::NoAvailableCategories) => {
                eprintln!(
                    "{}: no categories match '{}'",
                    path.display(),
                    workspace.settings().settings().category_filter_regexp
                );
            }
        }
    }
    Ok(opened)
}

/// Apply the selection to the current session
pub fn apply_selection(workspace: &mut Workspace, selection: &Selection) {
    if selection.all {
        workspace.select_all_categories();
    } else if !selection.categories.is_empty() {
        workspace.select_categories(selection.categories.iter().cloned());
    }
    workspace.filter_by_text(selection.text.as_deref().unwrap_or(""));
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.clone() else {
        return Err(anyhow!("No command given. Run 'wv --help' for usage."));
    };
    let mut workspace = load_workspace(&cli)?;

    match command {
        Commands::Categories { logs } => {
            let logs = resolve_logs(&workspace, &logs)?;
            let opened = open_logs(&mut workspace, &logs)?;
            for (i, session) in workspace.sessions().iter().enumerate() {
                if opened.len() > 1 {
                    if i > 0 {
                        println!();
                    }
                    println!("== {} ==", session.title());
                }
                print!("{}", render::render_categories(session.engine()));
            }
        }
        Commands::List {
            logs,
            selection,
            json,
            full,
        } => {
            let logs = resolve_logs(&workspace, &logs)?;
            let opened = open_logs(&mut workspace, &logs)?;
            for (i, path) in opened.iter().enumerate() {
                let Some(index) = workspace.session_index(path) else {
                    continue;
                };
                workspace.set_current(index);
                apply_selection(&mut workspace, &selection);

                let Some(session) = workspace.current() else {
                    continue;
                };
                let warnings = session.engine().visible_records();
                if json {
                    println!("{}", render::render_json(&warnings)?);
                } else {
                    if opened.len() > 1 {
                        if i > 0 {
                            println!();
                        }
                        println!("== {} ==", session.title());
                    }
                    print!("{}", render::render_warnings(&warnings, full));
                }
                if let Some(status) = workspace.status_message() {
                    eprintln!("{}", status);
                }
            }
        }
        Commands::Edit {
            log,
            index,
            selection,
        } => {
            let opened = open_logs(&mut workspace, std::slice::from_ref(&log))?;
            if opened.is_empty() {
                return Err(anyhow!("{} has no warnings to open", log.display()));
            }
            apply_selection(&mut workspace, &selection);
            println!("{}", workspace.editor_command(index)?);
        }
        Commands::Watch { logs } => {
            let logs = resolve_logs(&workspace, &logs)?;
            watch::run_watch(&mut workspace, logs).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
