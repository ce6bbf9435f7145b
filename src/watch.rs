//! Re-run tasks when watched files change

use crate::config::WatchRule;
use crate::error::Result;
use crate::glob::Pattern;
use crate::task::TaskRunner;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watch rules with their patterns compiled
pub struct WatchRules {
    rules: Vec<(Pattern, Vec<String>)>,
}

impl WatchRules {
    pub fn new(rules: &[WatchRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            compiled.push((Pattern::new(&rule.pattern)?, rule.tasks.clone()));
        }
        Ok(Self { rules: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Tasks triggered by changes to `paths`, deduplicated in rule order.
    ///
    /// Paths outside `root` and paths in `written` never match.
    pub fn tasks_for(
        &self,
        root: &Path,
        paths: &[PathBuf],
        written: &HashSet<PathBuf>,
    ) -> Vec<String> {
        let relative: Vec<String> = paths
            .iter()
            .filter(|path| !written.contains(*path))
            .filter_map(|path| path.strip_prefix(root).ok())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();

        let mut tasks: Vec<String> = Vec::new();
        for (pattern, rule_tasks) in &self.rules {
            if relative.iter().any(|path| pattern.matches_globstar(path)) {
                for task in rule_tasks {
                    if !tasks.contains(task) {
                        tasks.push(task.clone());
                    }
                }
            }
        }
        tasks
    }
}

/// Files persisted by the runner's tasks, in the watcher's canonical form
fn written_paths(runner: &TaskRunner<'_>) -> HashSet<PathBuf> {
    runner
        .context()
        .written_paths()
        .into_iter()
        .map(|path| std::fs::canonicalize(&path).unwrap_or(path))
        .collect()
}

/// Watch `root` recursively and run the tasks of matching rules after each
/// quiet period. Changes to files the tasks wrote themselves are ignored.
/// Returns on Ctrl-C.
pub async fn watch(
    root: &Path,
    rules: &WatchRules,
    runner: &mut TaskRunner<'_>,
    debounce: Duration,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Err(e) = tx.send(res) {
                error!("Failed to send watch event: {}", e);
            }
        },
        Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    info!("Watching {:?} for changes...", root);

    let mut pending: Vec<String> = Vec::new();
    let mut written = written_paths(runner);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stop watching.");
                break;
            }
            event = rx.recv() => match event {
                Some(Ok(event)) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        continue;
                    }
                    for task in rules.tasks_for(root, &event.paths, &written) {
                        if !pending.contains(&task) {
                            pending.push(task);
                        }
                    }
                }
                Some(Err(e)) => warn!("Watch error: {}", e),
                None => {
                    error!("Watch channel disconnected");
                    break;
                }
            },
            _ = tokio::time::sleep(debounce), if !pending.is_empty() => {
                let tasks = std::mem::take(&mut pending);
                debug!("Detected changes, running tasks: {:?}", tasks);
                match runner.run(&tasks[..]) {
                    Ok(summary) if summary.all_succeeded() => debug!("Rebuild completed successfully"),
                    Ok(summary) => warn!("Rebuild finished with failed tasks: {:?}", summary.failed()),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => error!("Rebuild failed: {}", e),
                }
                written = written_paths(runner);
            }
        }
    }

    drop(watcher);
    Ok(())
}
