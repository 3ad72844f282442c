//! Configuration loading from disk.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::belt::ToolId;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "cannot read config from: {}. Default config is written to: {}",
        .path.display(),
        .default_path.display()
    )]
    Missing { path: PathBuf, default_path: PathBuf },

    #[error("cannot write default config to {}: {reason}", .path.display())]
    WriteDefault { path: PathBuf, reason: String },
}

/// Where tool settings come from.
#[derive(Debug, Clone, Default)]
pub enum ConfigSource {
    /// No config file is used.
    #[default]
    Disabled,
    /// The file was read; one table per tool identifier.
    Loaded { path: PathBuf, table: toml::Table },
    /// The file does not exist yet.
    Missing { path: PathBuf },
}

impl ConfigSource {
    /// Read and parse the file at `path`. A missing file is not an error here.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found");
                return Ok(Self::Missing {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let table: toml::Table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), sections = table.len(), "Config file loaded");
        Ok(Self::Loaded {
            path: path.to_path_buf(),
            table,
        })
    }

    /// The section for one tool, if the file has a table under its name.
    pub fn section(&self, id: ToolId) -> Option<toml::Table> {
        match self {
            Self::Loaded { table, .. } => match table.get(id.name()) {
                Some(toml::Value::Table(section)) => Some(section.clone()),
                Some(other) => {
                    tracing::warn!(
                        tool = %id,
                        found = other.type_str(),
                        "Config section is not a table, ignoring"
                    );
                    None
                }
                None => None,
            },
            Self::Disabled | Self::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// Gate run before any tool starts.
    ///
    /// When the file is missing, a default file is written from `sections`
    /// and an error pointing at it is returned.
    pub fn ensure_loaded<F>(&self, suffix: &str, sections: F) -> Result<(), ConfigError>
    where
        F: FnOnce() -> Vec<(ToolId, toml::Table)>,
    {
        let Self::Missing { path } = self else {
            return Ok(());
        };

        let default_path = default_path(path, suffix);
        write_default(&default_path, sections())?;
        Err(ConfigError::Missing {
            path: path.clone(),
            default_path,
        })
    }
}

/// `path` with `suffix` appended to its file name.
pub fn default_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write one table per tool to `path`.
pub fn write_default(path: &Path, sections: Vec<(ToolId, toml::Table)>) -> Result<(), ConfigError> {
    let mut root = toml::Table::new();
    for (id, section) in sections {
        root.insert(id.name().to_string(), toml::Value::Table(section));
    }

    let rendered = toml::to_string_pretty(&root).map_err(|e| ConfigError::WriteDefault {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, rendered).map_err(|e| ConfigError::WriteDefault {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    tracing::warn!(path = %path.display(), "Default config written");
    Ok(())
}
