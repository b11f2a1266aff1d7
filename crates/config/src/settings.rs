use serde::{Deserialize, Serialize};
use sheetsort_engine::sort::{SortStrategy, DEFAULT_BUBBLE_THRESHOLD};
use sheetsort_engine::workbook::SORTED_PREFIX;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum SettingsError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    Write { path: PathBuf, message: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Read { path, message } => {
                write!(f, "Error reading {}: {}", path.display(), message)
            }
            SettingsError::Parse { path, message } => {
                write!(f, "Error parsing {}: {}", path.display(), message)
            }
            SettingsError::Write { path, message } => {
                write!(f, "Error writing {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Sorting
    #[serde(rename = "sort.strategy")]
    pub strategy: SortStrategy,

    #[serde(rename = "sort.bubbleThreshold")]
    pub bubble_threshold: usize,

    // Output
    #[serde(rename = "output.prefix")]
    pub output_prefix: String,

    // Logging
    #[serde(rename = "log.rootDir")]
    pub log_root_dir: Option<PathBuf>,  // None = current directory
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: SortStrategy::Auto,
            bubble_threshold: DEFAULT_BUBBLE_THRESHOLD,
            output_prefix: SORTED_PREFIX.to_string(),
            log_root_dir: None,
        }
    }
}

/// Drop lines starting with // so the file can carry comments
fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetsort");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location; a missing file means defaults
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file yields defaults; a file that
    /// exists but cannot be read or parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&strip_comments(&contents)).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save current settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_error = |message: String| SettingsError::Write {
            path: path.to_path_buf(),
            message,
        };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| write_error(e.to_string()))?;
        fs::write(path, json).map_err(|e| write_error(e.to_string()))
    }

    /// Log root, falling back to the current directory
    pub fn effective_log_root(&self) -> PathBuf {
        self.log_root_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
