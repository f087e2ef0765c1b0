//! Polling file watcher for a site's source tree.
//!
//! Polling instead of native events: rapid successive edits can slip past
//! event-based watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, PollWatcher, RecursiveMode, Watcher};

/// Directories never watched.
pub const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "dist"];

/// Start polling `root`. `on_change` runs on the watcher's thread with the
/// paths of every create/modify/remove event.
pub fn watch_tree<F>(
    root: &Path,
    interval: Duration,
    on_change: F,
) -> Result<PollWatcher, notify::Error>
where
    F: Fn(Vec<PathBuf>) + Send + 'static,
{
    let mut watcher = PollWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                    on_change(event.paths);
                }
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        },
        Config::default().with_poll_interval(interval),
    )?;

    watcher.watch(root, RecursiveMode::NonRecursive)?;
    for dir in watched_subdirs(root)? {
        watcher.watch(&dir, RecursiveMode::Recursive)?;
    }

    Ok(watcher)
}

/// Top-level directories of `root`, minus the ignored ones.
fn watched_subdirs(root: &Path) -> Result<Vec<PathBuf>, notify::Error> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(notify::Error::io)? {
        let entry = entry.map_err(notify::Error::io)?;
        let ignored = entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name));
        if !ignored && entry.file_type().map_err(notify::Error::io)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watched_subdirs_skips_ignored() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["src", "public", "node_modules", ".git", "dist"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("index.html"), "").unwrap();

        let dirs = watched_subdirs(dir.path()).unwrap();
        assert_eq!(dirs, vec![dir.path().join("public"), dir.path().join("src")]);
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = watch_tree(&dir.path().join("missing"), Duration::from_millis(100), |_| {});
        assert!(result.is_err());
    }
}
