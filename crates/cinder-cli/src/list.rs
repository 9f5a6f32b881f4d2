//! List command implementation for Cinder CLI.

use std::path::Path;

use cinder_core::{BuildContext, Mode};

use crate::{colors, project};

/// Print every discovered unit in scan order.
pub fn execute(root: &Path) -> anyhow::Result<()> {
    let config = project::load(root, None)?;
    let patterns = config.crates.join(", ");
    let ctx = BuildContext::discover(config, Mode::Development)?;

    if ctx.units().is_empty() {
        println!("{}No units found{} (patterns: {})", colors::YELLOW, colors::RESET, patterns);
        return Ok(());
    }

    for unit in ctx.units() {
        println!(
            "{}{}{} {}{}{}  {}",
            colors::BOLD,
            unit.name,
            colors::RESET,
            colors::DIM,
            unit.version,
            colors::RESET,
            unit.description
        );
        println!("    {}", unit.source_path.display());
    }

    Ok(())
}
