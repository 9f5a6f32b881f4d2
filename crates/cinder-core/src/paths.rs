//! Project directory management.
//!
//! Resolves the configured output directories against the project root so
//! the CLI, the server and the orchestrator agree on the same paths:
//!
//! ```text
//! project/
//! ├── cinder.toml
//! ├── crates/<unit>/        # Units (Cargo.toml, src/, assets/)
//! ├── target/               # Cargo target dir
//! ├── src/wasm/             # Development bindings
//! ├── src/wasm_dist/        # Production bindings
//! └── dist/assets/<unit>/   # Production assets
//! ```

use std::fs;
use std::path::PathBuf;

use crate::build::Mode;
use crate::config::CinderConfig;
use crate::error::Result;

/// Absolute output locations for a project.
#[derive(Debug, Clone)]
pub struct ProjectDirs {
    /// Project root.
    pub root: PathBuf,

    /// Development binding output.
    pub dev_out_dir: PathBuf,

    /// Production binding output.
    pub release_out_dir: PathBuf,

    /// Production output tree.
    pub dist_dir: PathBuf,

    /// Cargo target directory.
    pub target_dir: PathBuf,
}

impl ProjectDirs {
    /// Resolve directories from configuration. Nothing is created.
    pub fn from_config(config: &CinderConfig) -> Self {
        Self {
            root: config.root.clone(),
            dev_out_dir: config.resolve(&config.dev_out_dir),
            release_out_dir: config.resolve(&config.release_out_dir),
            dist_dir: config.resolve(&config.dist_dir),
            target_dir: config.resolve(&config.target_dir),
        }
    }

    /// Binding output directory for a mode.
    pub fn out_dir(&self, mode: Mode) -> &PathBuf {
        match mode {
            Mode::Development => &self.dev_out_dir,
            Mode::Production => &self.release_out_dir,
        }
    }

    /// Create the output directory for a mode.
    pub fn ensure(&self, mode: Mode) -> Result<()> {
        fs::create_dir_all(self.out_dir(mode))?;
        if mode == Mode::Production {
            fs::create_dir_all(&self.dist_dir)?;
        }
        Ok(())
    }

    /// Remove generated bindings and the production tree.
    ///
    /// The cargo target directory is left alone.
    pub fn clean(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for dir in [&self.dev_out_dir, &self.release_out_dir, &self.dist_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
                removed.push(dir.clone());
            }
        }
        Ok(removed)
    }
}
