//! Production asset emission.
//!
//! Copies every file under each unit's `assets/` directory into
//! `<dist>/assets/<unit>/<relative path>`, and optionally mirrors unit
//! readmes next to their bindings.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::artifacts::asset_output_path;
use crate::error::{Error, Result};
use crate::unit::CompilationUnit;

/// Files emitted for one unit.
#[derive(Debug)]
pub struct UnitEmit {
    pub unit: String,
    /// Destination paths, in walk order.
    pub files: Vec<PathBuf>,
    /// Set when emission for this unit stopped early.
    pub error: Option<Error>,
}

/// Outcome of emitting assets for all units.
#[derive(Debug, Default)]
pub struct EmitReport {
    pub units: Vec<UnitEmit>,
}

impl EmitReport {
    pub fn total_files(&self) -> usize {
        self.units.iter().map(|u| u.files.len()).sum()
    }

    pub fn unit(&self, name: &str) -> Option<&UnitEmit> {
        self.units.iter().find(|u| u.unit == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitEmit> {
        self.units.iter().filter(|u| u.error.is_some())
    }
}

/// Emit assets for every unit. A failure stops only that unit.
pub fn emit_assets(units: &[CompilationUnit], dist_dir: &Path) -> EmitReport {
    let units = units
        .iter()
        .map(|unit| {
            let mut files = Vec::new();
            let error = emit_unit(unit, dist_dir, &mut files).err().map(|e| {
                let err = Error::AssetEmit {
                    unit: unit.name.clone(),
                    message: e.to_string(),
                };
                tracing::error!(unit = %unit.name, "{}", err);
                err
            });

            if error.is_none() && !files.is_empty() {
                tracing::info!(unit = %unit.name, "Emitted {} asset(s)", files.len());
            }

            UnitEmit {
                unit: unit.name.clone(),
                files,
                error,
            }
        })
        .collect();

    EmitReport { units }
}

/// Copy each unit's readme to `<out_dir>/<unit>.md`.
///
/// Units without a readme are skipped; returns the files written.
pub fn mirror_readmes(units: &[CompilationUnit], out_dir: &Path) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for unit in units {
        let Some(readme) = unit.readme_path() else {
            tracing::info!(unit = %unit.name, "No readme found");
            continue;
        };

        let dest = out_dir.join(format!("{}.md", unit.name));
        let copied = fs::create_dir_all(out_dir).and_then(|_| fs::copy(&readme, &dest));
        match copied {
            Ok(_) => written.push(dest),
            Err(e) => tracing::warn!(unit = %unit.name, "Cannot copy readme: {}", e),
        }
    }
    written
}

fn emit_unit(unit: &CompilationUnit, dist_dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let assets = unit.assets_dir();
    if !assets.is_dir() {
        tracing::debug!(unit = %unit.name, "No assets directory");
        return Ok(());
    }

    for entry in WalkDir::new(&assets).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&assets)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let dest = asset_output_path(dist_dir, &unit.name, relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        files.push(dest);
    }

    Ok(())
}
