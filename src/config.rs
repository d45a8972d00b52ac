use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lock;
use crate::patterns;
use crate::platform::Platform;

/// Name of the project configuration file at the project root.
pub const CONFIG_FILE: &str = ".doc-manager.yml";

/// Version stamped into new configuration and baseline files.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Project configuration loaded from `.doc-manager.yml`.
/// Unknown keys are rejected rather than ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Documentation directory, relative to the project root.
    #[serde(default = "default_docs_path")]
    pub docs_path: String,
    /// User exclude patterns, checked before gitignore and defaults.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Descriptive metadata written at initialization.
    #[serde(default)]
    pub metadata: Metadata,
    /// Documentation platform in use.
    #[serde(default)]
    pub platform: Platform,
    /// Source directories of interest, relative to the project root.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Whether `.gitignore` patterns join the exclude set.
    #[serde(default)]
    pub use_gitignore: bool,
}

/// The `metadata` block of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    /// RFC 3339 creation timestamp.
    #[serde(default)]
    pub created: String,
    /// Detected primary language.
    #[serde(default)]
    pub language: String,
    /// Configuration format version.
    #[serde(default)]
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            docs_path: default_docs_path(),
            exclude: Vec::new(),
            metadata: Metadata::default(),
            platform: Platform::Unknown,
            sources: Vec::new(),
            use_gitignore: false,
        };
    }
}

impl Config {
    /// Load the configuration from `root`, or `None` if the file doesn't exist.
    /// A file that exists but is malformed, carries unknown keys or unsafe
    /// exclude patterns is an error, never a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io`, `Error::Yaml`, `Error::InvalidPattern` or
    /// `Error::TooManyPatterns`.
    pub fn load(root: &Path) -> Result<Option<Self>, Error> {
        let path = Self::path(root);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        let config: Self = serde_yaml::from_str(&content)?;
        patterns::validate_patterns(&config.exclude)?;
        return Ok(Some(config));
    }

    /// Load the configuration, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_or_default(root: &Path) -> Result<Self, Error> {
        return Ok(Self::load(root)?.unwrap_or_default());
    }

    /// Location of the configuration file under `root`.
    pub fn path(root: &Path) -> PathBuf {
        return root.join(CONFIG_FILE);
    }

    /// Serialize and atomically replace the configuration file under its lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Yaml` if serialization fails, or a lock/IO error.
    pub fn write(&self, root: &Path) -> Result<(), Error> {
        let content = serde_yaml::to_string(self)?;
        return lock::write_atomic(&Self::path(root), content.as_bytes());
    }
}

/// Default documentation directory.
fn default_docs_path() -> String {
    return "docs".to_string();
}
