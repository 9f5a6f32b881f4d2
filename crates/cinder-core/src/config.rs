//! Project configuration.
//!
//! Loaded from `cinder.toml` at the project root. Every key is optional:
//!
//! ```toml
//! crates = ["crates/*"]
//! dev_out_dir = "src/wasm"
//! release_out_dir = "src/wasm_dist"
//! url_prefix = "/wasm"
//! optimize = true
//! jobs = 2
//! watch_debounce_ms = 5000
//!
//! [toolchain]
//! wasm_bindgen = "wasm-bindgen"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "cinder.toml";

/// Configuration for one project.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CinderConfig {
    /// Project root. Set from the config file location, never read from it.
    #[serde(skip)]
    pub root: PathBuf,

    /// Unit patterns, relative to `root`.
    pub crates: Vec<String>,

    /// Output directory for development bindings.
    pub dev_out_dir: PathBuf,

    /// Output directory for production bindings.
    pub release_out_dir: PathBuf,

    /// Production output tree receiving `assets/<unit>/...`.
    pub dist_dir: PathBuf,

    /// Cargo target directory.
    pub target_dir: PathBuf,

    /// Target triple passed to cargo.
    pub target_triple: String,

    /// URL prefix the dev server answers artifact requests under.
    pub url_prefix: String,

    /// Directory receiving generated view entries. `None` disables them.
    pub pages_dir: Option<PathBuf>,

    /// Directory served as-is by the dev server after the interceptor.
    pub static_dir: PathBuf,

    /// Run `wasm-opt` on production builds.
    pub optimize: bool,

    /// Skip compiler and bindgen for units whose artifacts are fresh.
    pub incremental: bool,

    /// Copy each unit's readme next to its bindings.
    pub copy_readmes: bool,

    /// Maximum number of units built concurrently.
    pub jobs: usize,

    /// Timeout for a single external tool invocation.
    pub timeout_secs: u64,

    /// Debounce window for the dev rebuild watcher. `None` disables watching.
    pub watch_debounce_ms: Option<u64>,

    /// External tool names or paths.
    pub toolchain: ToolchainConfig,
}

/// External tool names or paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    pub cargo: String,
    pub wasm_bindgen: String,
    pub wasm_opt: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            wasm_bindgen: "wasm-bindgen".to_string(),
            wasm_opt: "wasm-opt".to_string(),
        }
    }
}

impl Default for CinderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            crates: vec!["crates/*".to_string()],
            dev_out_dir: PathBuf::from("src/wasm"),
            release_out_dir: PathBuf::from("src/wasm_dist"),
            dist_dir: PathBuf::from("dist"),
            target_dir: PathBuf::from("target"),
            target_triple: "wasm32-unknown-unknown".to_string(),
            url_prefix: "/wasm".to_string(),
            pages_dir: Some(PathBuf::from("src/pages")),
            static_dir: PathBuf::from("public"),
            optimize: false,
            incremental: true,
            copy_readmes: false,
            jobs: 1,
            timeout_secs: 30 * 60,
            watch_debounce_ms: None,
            toolchain: ToolchainConfig::default(),
        }
    }
}

impl CinderConfig {
    /// Load the configuration for a project root.
    ///
    /// A missing `cinder.toml` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist, the file cannot be read
    /// or parsed, or validation fails.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "project root {} is not a directory",
                root.display()
            )));
        }

        let file = root.join(CONFIG_FILE);
        let mut config = if file.exists() {
            let text = fs::read_to_string(&file)?;
            Self::from_toml(&text)?
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, root.display());
            Self::default()
        };

        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text. `root` is left at its default.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(Error::Config("jobs must be at least 1".to_string()));
        }
        if !self.url_prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "url_prefix must start with '/': {}",
                self.url_prefix
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Timeout applied to each external tool invocation.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The URL prefix without a trailing slash.
    pub fn url_prefix(&self) -> &str {
        let trimmed = self.url_prefix.trim_end_matches('/');
        if trimmed.is_empty() { "/" } else { trimmed }
    }
}
