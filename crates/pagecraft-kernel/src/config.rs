//! Editor configuration.
//!
//! Loaded from TOML. Every section and field has a default, so an empty file
//! is a valid configuration:
//!
//! ```toml
//! [generation]
//! timeout_ms = 30000
//! model = "default"
//! max_tokens = 2048
//!
//! [persistence]
//! backend = "sqlite"
//! path = "pages.db"
//!
//! [events]
//! capacity = 256
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::SqlitePersistence;
use crate::persistence::{MemoryPersistence, PagePersistence};

/// Configuration could not be read or is not usable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to open persistence backend: {0}")]
    Backend(#[from] rusqlite::Error),
}

/// Top-level editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub generation: GenerationConfig,
    pub persistence: PersistenceConfig,
    pub events: EventsConfig,
}

impl EditorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.timeout_ms == 0 {
            return Err(ConfigError::Invalid("generation.timeout_ms must be positive".into()));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::Invalid("generation.max_tokens must be positive".into()));
        }
        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "generation.temperature must be within 0.0..=2.0, got {t}"
                )));
            }
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Invalid("events.capacity must be positive".into()));
        }
        if self.persistence.backend == Backend::Sqlite && self.persistence.path.is_none() {
            return Err(ConfigError::Invalid("persistence.path is required for sqlite".into()));
        }
        Ok(())
    }
}

/// Settings for content generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Text placed before the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            model: "default".to_string(),
            max_tokens: 2048,
            temperature: None,
            system_prompt: None,
        }
    }
}

/// Which page store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceConfig {
    pub backend: Backend,
    /// Database file (sqlite only).
    pub path: Option<PathBuf>,
}

impl PersistenceConfig {
    /// Open the configured backend.
    pub fn connect(&self) -> Result<Arc<dyn PagePersistence>, ConfigError> {
        match (self.backend, &self.path) {
            (Backend::Memory, _) => Ok(Arc::new(MemoryPersistence::new())),
            (Backend::Sqlite, Some(path)) => Ok(Arc::new(SqlitePersistence::open(path)?)),
            (Backend::Sqlite, None) => Err(ConfigError::Invalid(
                "persistence.path is required for sqlite".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// Broadcast channel capacity for page events.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}
