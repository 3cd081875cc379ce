use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use tracing::debug;

use crate::io::data_io::{CONFIG_FILE, atomic_write};
use crate::model::config::TallyConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("invalid {path}: {message}")]
    ParseError { path: PathBuf, message: String },
    #[error("unknown config key: {0} (known keys: {known})", known = KEYS.join(", "))]
    UnknownKey(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Settable keys, as `table.field`
pub const KEYS: &[&str] = &[
    "query.pinned_title",
    "query.exclude_pinned_from_categories",
    "query.search_pinned",
    "display.date_format",
];

/// Read tally.toml, returning the parsed config and the raw document for
/// round-trip-safe editing. A missing file reads as defaults.
pub fn read_config(dir: &Path) -> Result<(TallyConfig, toml_edit::DocumentMut), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            String::new()
        }
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    let config: TallyConfig = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        message: e.message().to_string(),
    })?;
    let doc: toml_edit::DocumentMut =
        text.parse()
            .map_err(|e: toml_edit::TomlError| ConfigError::ParseError {
                path,
                message: e.message().to_string(),
            })?;
    Ok((config, doc))
}

/// Write the document back, preserving comments and layout
pub fn write_config(dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Current value of a key, formatted as it would be written
pub fn get_value(config: &TallyConfig, key: &str) -> Result<String, ConfigError> {
    let value = match key {
        "query.pinned_title" => config.query.pinned_title.clone(),
        "query.exclude_pinned_from_categories" => {
            config.query.exclude_pinned_from_categories.to_string()
        }
        "query.search_pinned" => config.query.search_pinned.to_string(),
        "display.date_format" => config.display.date_format.clone(),
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    };
    Ok(value)
}

/// Validate `raw` for `key` and store it in the document
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let Some((table, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    };

    let value = match key {
        "query.exclude_pinned_from_categories" | "query.search_pinned" => {
            let flag: bool = raw
                .trim()
                .parse()
                .map_err(|_| invalid("expected true or false"))?;
            toml_edit::value(flag)
        }
        "query.pinned_title" => {
            let title = raw.trim();
            if title.is_empty() {
                return Err(invalid("must not be empty"));
            }
            toml_edit::value(title)
        }
        "display.date_format" => {
            if raw.is_empty() || StrftimeItems::new(raw).any(|item| matches!(item, Item::Error)) {
                return Err(invalid("not a valid strftime format"));
            }
            toml_edit::value(raw)
        }
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    };

    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][field] = value;
    Ok(())
}
