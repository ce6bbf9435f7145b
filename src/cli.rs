use crate::config::{Manifest, constants};
use crate::error::{ConfigError, Result};
use crate::task::{TaskRegistry, TaskRunner};
use crate::util::file::absolutize;
use crate::watch::{WatchRules, watch};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Beltline, a streaming file process tool
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Tasks to run one by one, `default` when empty
    pub tasks: Vec<String>,
    /// Manifest declaring the tasks
    #[clap(short, long, default_value = constants::CONFIG_FILE)]
    pub config: PathBuf,
    /// Pipeline root, overrides the manifest's `cwd`
    #[clap(short = 'C', long)]
    pub cwd: Option<PathBuf>,
    /// Keep running and re-run tasks on file changes
    #[clap(short, long)]
    pub watch: bool,
    /// List available tasks and exit
    #[clap(short, long)]
    pub list: bool,
    /// Write a debug-level log to this file
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

/// A loaded manifest and the directory its pipelines resolve from
pub struct Workspace {
    pub manifest: Manifest,
    pub root: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn workspace(&self) -> std::result::Result<Workspace, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        let config = absolutize(&cwd, &self.config);
        let manifest = Manifest::load(&config)?;
        manifest.validate()?;

        let manifest_dir = config.parent().unwrap_or(Path::new("/")).to_path_buf();
        let root = match &self.cwd {
            Some(dir) => absolutize(&cwd, dir),
            None => absolutize(&cwd, &manifest.root(&manifest_dir)),
        };
        let log_file = match &self.log_file {
            Some(path) => Some(absolutize(&cwd, path)),
            None => manifest
                .log_file
                .as_ref()
                .map(|path| absolutize(&manifest_dir, path)),
        };

        Ok(Workspace {
            manifest,
            root,
            log_file,
        })
    }
}

/// Print usage and the registered task names
pub fn print_help(registry: &TaskRegistry) {
    let program = std::env::args()
        .next()
        .and_then(|arg| {
            Path::new(&arg)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "beltline".to_string());

    println!("Beltline, a streaming file process tool.");
    println!();
    println!("Usage:");
    println!("  {program} [task_queue...]");
    println!();
    println!("Example:");
    println!("  {program} task1 task2 task3 task4");
    println!("  # run task from task1 to task4 one by one");
    println!();
    println!("Available Tasks:");
    println!("  {}", registry.names().join(" "));
}

pub async fn run_command(args: Cli, workspace: Workspace) -> Result<()> {
    let Workspace { manifest, root, .. } = workspace;
    debug!("Pipeline root: {:?}", root);

    let mut registry = TaskRegistry::new();
    manifest.register_tasks(&root, &mut registry);

    if args.list {
        print_help(&registry);
        return Ok(());
    }

    let tasks = if args.tasks.is_empty() {
        vec![constants::DEFAULT_TASK.to_string()]
    } else {
        args.tasks.clone()
    };

    let mut runner = TaskRunner::new(&registry);
    let summary = runner.run(tasks.as_slice())?;
    if !summary.all_succeeded() {
        warn!("Failed tasks: {:?}", summary.failed());
    }

    if args.watch {
        let rules = WatchRules::new(&manifest.watch)?;
        if rules.is_empty() {
            warn!("No watch rules declared, nothing to watch.");
            return Ok(());
        }
        let watch_root = std::fs::canonicalize(&root).unwrap_or(root);
        info!("Entering watch mode...");
        watch(
            &watch_root,
            &rules,
            &mut runner,
            Duration::from_millis(manifest.debounce_ms),
        )
        .await?;
    }

    Ok(())
}
