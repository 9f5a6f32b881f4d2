//! Clean command implementation for Cinder CLI.

use std::path::Path;

use cinder_core::ProjectDirs;

use crate::{colors, project};

/// Remove generated output directories.
pub fn execute(root: &Path) -> anyhow::Result<()> {
    let config = project::load(root, None)?;
    let removed = ProjectDirs::from_config(&config).clean()?;

    if removed.is_empty() {
        println!("Nothing to clean");
    }
    for dir in removed {
        println!("{}Removed{} {}", colors::GREEN, colors::RESET, dir.display());
    }

    Ok(())
}
