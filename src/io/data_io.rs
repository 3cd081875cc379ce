use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::model::dataset::Dataset;

/// Name of the directory holding tally's files, under the project root
pub const DIR_NAME: &str = "tally";
pub const DATA_FILE: &str = "data.json";
pub const CONFIG_FILE: &str = "tally.toml";

/// Error type for data file I/O
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("no tally/ directory found (run `tally init`)")]
    NotInitialized,
    #[error("tally/ already exists at {0} (use --force to reinitialize)")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not serialize data: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
}

const CONFIG_TEMPLATE: &str = r#"# tally configuration

[query]
# Title of the section listing pinned trackers first
pinned_title = "Pinned"
# Show pinned trackers only in the pinned section, not again under their category
exclude_pinned_from_categories = false
# Narrow the pinned section by the search text too
search_pinned = false

[display]
# chrono format for dates in listings
date_format = "%d.%m.%y"
"#;

/// Walk up from `start` looking for a `tally/` directory with a data file.
/// Returns the `tally/` directory itself.
pub fn discover_dir(start: &Path) -> Result<PathBuf, DataError> {
    let mut current = start.to_path_buf();
    loop {
        let dir = current.join(DIR_NAME);
        if dir.is_dir() && dir.join(DATA_FILE).exists() {
            return Ok(dir);
        }
        if !current.pop() {
            return Err(DataError::NotInitialized);
        }
    }
}

/// Create `root/tally/` with a default config and an empty data file.
///
/// With `force`, an existing directory is reset: the data file is emptied
/// but an existing config is kept.
pub fn init_dir(root: &Path, force: bool) -> Result<PathBuf, DataError> {
    let dir = root.join(DIR_NAME);
    if dir.join(DATA_FILE).exists() && !force {
        return Err(DataError::AlreadyInitialized(dir));
    }
    fs::create_dir_all(&dir).map_err(|e| DataError::WriteError {
        path: dir.clone(),
        source: e,
    })?;

    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        atomic_write(&config_path, CONFIG_TEMPLATE.as_bytes()).map_err(|e| {
            DataError::WriteError {
                path: config_path.clone(),
                source: e,
            }
        })?;
    }
    save_dataset(&dir, &Dataset::default())?;
    debug!(dir = %dir.display(), "initialized tally directory");
    Ok(dir)
}

/// Load `data.json`. A missing file is an empty dataset; an unreadable or
/// malformed one is an error.
pub fn load_dataset(dir: &Path) -> Result<Dataset, DataError> {
    let path = dir.join(DATA_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "data file missing, starting empty");
            return Ok(Dataset::default());
        }
        Err(e) => return Err(DataError::ReadError { path, source: e }),
    };
    let dataset: Dataset =
        serde_json::from_str(&text).map_err(|e| DataError::ParseError {
            path: path.clone(),
            source: e,
        })?;
    debug!(
        trackers = dataset.trackers.len(),
        categories = dataset.categories.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Save `data.json` atomically
pub fn save_dataset(dir: &Path, dataset: &Dataset) -> Result<(), DataError> {
    let path = dir.join(DATA_FILE);
    let mut content = serde_json::to_string_pretty(dataset)?;
    content.push('\n');
    atomic_write(&path, content.as_bytes()).map_err(|e| DataError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    debug!(path = %path.display(), "saved dataset");
    Ok(())
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
