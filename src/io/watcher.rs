use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{trace, warn};

use crate::io::data_io::DATA_FILE;

/// Watches `tally/data.json` for writes made by other processes.
pub struct DataWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<PathBuf>,
}

impl DataWatcher {
    /// Start watching the given `tally/` directory.
    ///
    /// The directory rather than the file is watched, because atomic saves
    /// replace the file with a rename.
    pub fn start(dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let data_path = dir.join(DATA_FILE);

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(error = %e, "watch error");
                        return;
                    }
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                // Non-recursive, so a matching file name is the data file
                if event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == data_path.file_name())
                {
                    trace!(kind = ?event.kind, "data file event");
                    let _ = tx.send(data_path.clone());
                }
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(DataWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Block up to `timeout` for a change, then drain any burst that follows
    /// within `settle`.
    pub fn wait(&self, timeout: Duration, settle: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(_) => {
                while self.rx.recv_timeout(settle).is_ok() {}
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn data_file_writes_are_seen() {
        let tmp = TempDir::new().unwrap();
        let watcher = DataWatcher::start(tmp.path()).unwrap();
        fs::write(tmp.path().join(DATA_FILE), "{}").unwrap();
        assert!(watcher.wait(Duration::from_secs(5), Duration::from_millis(50)));
    }

    #[test]
    fn other_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let watcher = DataWatcher::start(tmp.path()).unwrap();
        fs::write(tmp.path().join("notes.txt"), "hi").unwrap();
        assert!(!watcher.wait(Duration::from_millis(200), Duration::from_millis(10)));
    }
}
