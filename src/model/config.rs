use serde::{Deserialize, Serialize};

/// Configuration from tally.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// How the tracker list is assembled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Title of the synthetic section holding pinned trackers
    #[serde(default = "default_pinned_title")]
    pub pinned_title: String,
    /// Hide pinned trackers from their category section (they still show
    /// in the pinned section). Off by default: pinned trackers appear twice.
    #[serde(default)]
    pub exclude_pinned_from_categories: bool,
    /// Apply the search text to the pinned section too
    #[serde(default)]
    pub search_pinned: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            pinned_title: default_pinned_title(),
            exclude_pinned_from_categories: false,
            search_pinned: false,
        }
    }
}

fn default_pinned_title() -> String {
    "Pinned".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// chrono format string for dates in human output
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            date_format: default_date_format(),
        }
    }
}

fn default_date_format() -> String {
    "%d.%m.%y".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: TallyConfig = toml::from_str("").unwrap();
        assert_eq!(config, TallyConfig::default());
        assert_eq!(config.query.pinned_title, "Pinned");
        assert!(!config.query.exclude_pinned_from_categories);
        assert_eq!(config.display.date_format, "%d.%m.%y");
    }

    #[test]
    fn partial_tables_fill_in() {
        let config: TallyConfig = toml::from_str(
            r#"
[query]
exclude_pinned_from_categories = true
"#,
        )
        .unwrap();
        assert!(config.query.exclude_pinned_from_categories);
        assert_eq!(config.query.pinned_title, "Pinned");
        assert!(!config.query.search_pinned);
    }
}
