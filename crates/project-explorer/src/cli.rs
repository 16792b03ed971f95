//! Command-line front end.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;

use crate::app::fileops;
use crate::app::paths::{self, Separator};
use crate::app::project::{Project, ProjectStore};
use crate::app::reload::{DEFAULT_DEBOUNCE, SettingsHandle, SettingsWatcher};
use crate::domain::model::{CurrentItem, ResolvedMenuEntry, Selection};
use crate::infra::clipboard::Clipboard;
use crate::infra::launcher::{Launcher, ShellLauncher};
use crate::infra::settings::{ensure_settings_file, settings_path};

const BIN_NAME: &str = "project-explorer";

#[derive(Parser, Debug)]
#[command(
    name = BIN_NAME,
    author,
    version,
    about = "Context menus, file operations, and projects for a project-oriented file explorer",
    long_about = None
)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the context menu for a selection
    Menu {
        /// Focused file or directory
        #[arg(long, value_name = "PATH")]
        current: Option<PathBuf>,
        /// Include entries that would be hidden
        #[arg(long)]
        all: bool,
        selected: Vec<String>,
    },
    /// Run a context menu entry by label
    Run {
        label: String,
        #[arg(long, value_name = "PATH")]
        current: Option<PathBuf>,
        /// Print the command instead of launching it
        #[arg(long)]
        dry_run: bool,
        selected: Vec<String>,
    },
    /// Open a file with its open_with command or the system default
    Open {
        path: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// List a directory, honouring regex_filters
    Ls { dir: Option<PathBuf> },
    /// Complete a partially typed directory path
    Complete { partial: String },
    /// Move paths to the trash directory
    Trash {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Delete paths permanently
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Copy paths to the clipboard
    Copy {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Paste paths (or the clipboard) into a directory
    Paste {
        #[arg(long, value_name = "DIR")]
        into: Option<PathBuf>,
        paths: Vec<PathBuf>,
    },
    /// Create a new empty file
    NewFile { dir: PathBuf },
    /// Create a new empty directory
    NewDir { dir: PathBuf },
    /// Manage saved projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Validate settings and report skipped entries
    Check,
    /// Reload settings whenever the file changes
    Watch {
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Save a project with the given roots
    Save {
        name: String,
        #[arg(required = true)]
        roots: Vec<PathBuf>,
        /// Pane sizes, comma separated
        #[arg(long, value_delimiter = ',')]
        sizes: Vec<u32>,
    },
    /// Show a saved project
    Show { name: String },
    /// List saved projects
    List,
    /// Print the next free project name
    NextName,
}

/// Parse the process arguments and run.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &ShellLauncher::new(), &mut out)
}

/// Run an already parsed command line, launching through `launcher` and printing to `out`.
pub fn execute(cli: Cli, launcher: &dyn Launcher, out: &mut dyn Write) -> Result<()> {
    let Cli {
        settings,
        json,
        command,
    } = cli;

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, out);
        return Ok(());
    }

    let settings_file = settings_path(settings)
        .context("could not determine a settings location; pass --settings")?;
    if matches!(command, Commands::Watch { .. }) {
        ensure_settings_file(&settings_file)?;
    }
    let handle = SettingsHandle::load(&settings_file)?;
    let snapshot = handle.snapshot();
    tracing::debug!(settings = %settings_file.display(), "settings loaded");

    match command {
        Commands::Menu {
            current,
            all,
            selected,
        } => {
            let selection = Selection::new(selected);
            let current = current.map(CurrentItem::probe);
            let entries: Vec<ResolvedMenuEntry> = snapshot
                .menu
                .evaluate(&selection, current.as_ref())
                .into_iter()
                .filter(|entry| all || entry.visible)
                .collect();
            if json {
                print_json(out, &entries)?;
            } else {
                write!(out, "{}", render_entries(&entries))?;
            }
        }
        Commands::Run {
            label,
            current,
            dry_run,
            selected,
        } => {
            let selection = Selection::new(selected);
            let current = current.map(CurrentItem::probe);
            let entry = snapshot
                .menu
                .resolve_label(&label, &selection, current.as_ref())
                .with_context(|| format!("no context menu entry labelled {label:?}"))?;
            let command = match entry.command {
                Some(command) if entry.enabled => command,
                _ => bail!("context menu entry {label:?} is disabled for this selection"),
            };
            if dry_run {
                writeln!(out, "{command}")?;
            } else {
                launcher.launch(&command)?;
            }
        }
        Commands::Open { path, dry_run } => {
            let command = snapshot.open_with.resolve(&path.to_string_lossy());
            match (command, dry_run) {
                (Some(command), true) => writeln!(out, "{command}")?,
                (Some(command), false) => launcher.launch(&command)?,
                (None, true) => writeln!(out, "default: {}", path.display())?,
                (None, false) => launcher.open_default(&path)?,
            }
        }
        Commands::Ls { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let entries = paths::list_directory(&dir, &snapshot.filter)?;
            if json {
                print_json(out, &entries)?;
            } else {
                let sep = Separator::native().as_char();
                for entry in entries {
                    let suffix = if entry.is_dir { sep.to_string() } else { String::new() };
                    writeln!(out, "{}{suffix}", entry.path.display())?;
                }
            }
        }
        Commands::Complete { partial } => {
            let candidates =
                paths::complete_path(&partial, Separator::native()).unwrap_or_default();
            if json {
                print_json(out, &candidates)?;
            } else {
                print_lines(out, candidates.iter())?;
            }
        }
        Commands::Trash { paths } => {
            let trash = snapshot.trash();
            let moved = paths
                .iter()
                .map(|path| trash.move_to_trash(path))
                .collect::<Result<Vec<_>>>()?;
            print_paths(out, json, &moved)?;
        }
        Commands::Delete { paths } => {
            for path in &paths {
                fileops::delete_permanently(path)?;
            }
            print_paths(out, json, &paths)?;
        }
        Commands::Copy { paths } => {
            let absolute = paths
                .iter()
                .map(|path| absolute_path(path))
                .collect::<Result<Vec<_>>>()?;
            Clipboard::new().copy_paths(&absolute)?;
            print_paths(out, json, &absolute)?;
        }
        Commands::Paste { into, paths } => {
            let sources = if paths.is_empty() {
                Clipboard::new().read_paths()?
            } else {
                paths
            };
            let into = into.unwrap_or_else(|| PathBuf::from("."));
            let pasted = fileops::paste_into(&into, &sources)?;
            print_paths(out, json, &pasted)?;
        }
        Commands::NewFile { dir } => {
            let created = fileops::create_file(&dir)?;
            print_paths(out, json, &[created])?;
        }
        Commands::NewDir { dir } => {
            let created = fileops::create_directory(&dir)?;
            print_paths(out, json, &[created])?;
        }
        Commands::Project { command } => {
            project_command(command, &snapshot.projects(), json, out)?;
        }
        Commands::Check => {
            let diagnostics = snapshot.diagnostics();
            if json {
                let report = CheckReport {
                    settings: &settings_file,
                    menu_rules: snapshot.menu.len(),
                    open_with_rules: snapshot.open_with.len(),
                    diagnostics: diagnostics.iter().map(ToString::to_string).collect(),
                };
                print_json(out, &report)?;
            } else {
                writeln!(out, "settings: {}", settings_file.display())?;
                writeln!(out, "menu rules: {}", snapshot.menu.len())?;
                writeln!(out, "open-with rules: {}", snapshot.open_with.len())?;
                for diagnostic in diagnostics {
                    writeln!(out, "skipped: {diagnostic}")?;
                }
            }
            if !diagnostics.is_empty() {
                bail!("{} settings entries were skipped", diagnostics.len());
            }
        }
        Commands::Watch { debounce_ms } => {
            let debounce = debounce_ms.map_or(DEFAULT_DEBOUNCE, Duration::from_millis);
            writeln!(out, "watching {}", handle.path().display())?;
            out.flush()?;
            let _watcher = SettingsWatcher::spawn(handle.clone(), debounce, |snapshot| {
                tracing::info!(
                    menu_rules = snapshot.menu.len(),
                    diagnostics = snapshot.diagnostics().len(),
                    "settings applied"
                );
            })?;
            loop {
                thread::park();
            }
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn project_command(
    command: ProjectCommand,
    store: &ProjectStore,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        ProjectCommand::Save { name, roots, sizes } => {
            let mut project = Project::new(name);
            for root in &roots {
                project.add_root(absolute_path(root)?);
            }
            project.sizes = sizes;
            let saved = store.save(&project)?;
            print_paths(out, json, &[saved])?;
        }
        ProjectCommand::Show { name } => {
            let project = store.open(&name)?;
            if json {
                print_json(out, &project)?;
            } else {
                writeln!(out, "{}", project.name)?;
                for (index, root) in project.roots.iter().enumerate() {
                    match project.sizes.get(index) {
                        Some(size) => writeln!(out, "  {} ({size})", root.display())?,
                        None => writeln!(out, "  {}", root.display())?,
                    }
                }
            }
        }
        ProjectCommand::List => {
            let names = store.list()?;
            if json {
                print_json(out, &names)?;
            } else {
                print_lines(out, names.iter())?;
            }
        }
        ProjectCommand::NextName => {
            let name = store.next_project_name([])?;
            if json {
                print_json(out, &name)?;
            } else {
                writeln!(out, "{name}")?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckReport<'a> {
    settings: &'a Path,
    menu_rules: usize,
    open_with_rules: usize,
    diagnostics: Vec<String>,
}

/// Plain-text menu: enabled entries with their command, disabled ones marked.
pub fn render_entries(entries: &[ResolvedMenuEntry]) -> String {
    let width = entries
        .iter()
        .map(|entry| entry.label.chars().count())
        .max()
        .unwrap_or(0);

    let mut rendered = String::new();
    for entry in entries {
        let line = match (&entry.command, entry.enabled) {
            (Some(command), true) => format!("+ {:<width$}  {command}", entry.label),
            _ => format!("- {:<width$}  (disabled)", entry.label),
        };
        let _ = writeln!(rendered, "{}", line.trim_end());
    }
    rendered
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("failed to resolve {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    writeln!(out, "{text}")?;
    Ok(())
}

fn print_lines<I, S>(out: &mut dyn Write, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn print_paths(out: &mut dyn Write, json: bool, paths: &[PathBuf]) -> Result<()> {
    if json {
        print_json(out, paths)
    } else {
        print_lines(out, paths.iter().map(|path| path.display()))
    }
}
