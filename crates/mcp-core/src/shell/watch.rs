//! Hot-reload watcher for shell-tool definition directories (§4.7 step 7)
//!
//! Wraps [`notify`] and translates filesystem events on the configured tool
//! directory into add/modify/remove operations against a provider's map,
//! one file at a time, so a bad edit to one YAML file never disturbs the
//! tools already loaded from its siblings.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// One normalized filesystem change to a tool directory
#[derive(Debug, Clone)]
pub enum ToolChange {
    /// A `*.yaml`/`*.yml` file was created or modified
    Upserted(PathBuf),
    /// A `*.yaml`/`*.yml` file was removed
    Removed(PathBuf),
}

/// A live watch on a tool directory. Dropping this stops the watch.
pub struct ToolWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<ToolChange>,
}

impl ToolWatcher {
    /// Start watching `dir` (non-recursively) for YAML changes.
    ///
    /// # Errors
    ///
    /// Returns [`notify::Error`] if the underlying OS watch can't be
    /// established.
    pub fn start(dir: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            let Ok(event) = event else { return };
            for path in &event.paths {
                if !is_yaml(path) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Remove(_) => ToolChange::Removed(path.clone()),
                    EventKind::Create(_) | EventKind::Modify(_) => ToolChange::Upserted(path.clone()),
                    _ => continue,
                };
                let _ = tx.send(change);
            }
        })?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self { _watcher: watcher, receiver: rx })
    }

    /// Await the next batch of changes
    pub async fn recv(&mut self) -> Option<ToolChange> {
        self.receiver.recv().await
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|ext| ext == "yaml" || ext == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_yaml_matches_both_extensions() {
        assert!(is_yaml(Path::new("tool.yaml")));
        assert!(is_yaml(Path::new("tool.yml")));
        assert!(!is_yaml(Path::new("tool.txt")));
    }

    #[tokio::test]
    async fn detects_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = ToolWatcher::start(dir.path()).unwrap();

        let file_path = dir.path().join("new_tool.yaml");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        std::fs::write(&file_path, "name: x\ncommand: [\"true\"]\n").unwrap();

        let change = tokio::time::timeout(std::time::Duration::from_secs(5), watcher.recv()).await;
        assert!(matches!(change, Ok(Some(ToolChange::Upserted(_)))));
    }
}
