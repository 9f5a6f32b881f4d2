//! Project loading shared by all commands.

use std::path::Path;

use anyhow::Context;
use cinder_core::CinderConfig;

use crate::colors;

/// Load `cinder.toml` from `root`, applying command-line overrides.
pub fn load(root: &Path, jobs: Option<usize>) -> anyhow::Result<CinderConfig> {
    if !root.is_dir() {
        anyhow::bail!("Project root not found: {}", root.display());
    }

    let root = root
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", root.display()))?;

    let mut config = CinderConfig::load(&root)
        .with_context(|| format!("Invalid configuration in {}", root.display()))?;

    if let Some(jobs) = jobs {
        config.jobs = jobs;
        config.validate()?;
    }

    Ok(config)
}

/// Print the command banner.
pub fn print_header(action: &str, config: &CinderConfig) {
    println!("\n{}Cinder{} - {}", colors::BOLD, colors::RESET, action);
    println!("{}", "─".repeat(50));
    println!(
        "{}  ◆ Project:{} {}",
        colors::CYAN,
        colors::RESET,
        config.root.display()
    );
}
