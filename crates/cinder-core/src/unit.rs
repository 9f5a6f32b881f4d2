//! Compilation units and their manifests.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Manifest file name expected in every unit directory.
pub const MANIFEST_FILE: &str = "Cargo.toml";

/// Dependency tables that may name local paths.
const DEPENDENCY_TABLES: &[&str] = &["dependencies", "build-dependencies"];

/// Readme names tried, in order.
const README_NAMES: &[&str] = &["readme.md", "README.md"];

/// One Rust crate compiled to a wasm module.
///
/// Built fresh by the scanner on every build cycle and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Package name, unique within a cycle.
    pub name: String,

    /// Free-form description from the manifest.
    pub description: String,

    /// Version from the manifest.
    pub version: String,

    /// Directory holding the manifest.
    pub source_path: PathBuf,
}

/// The part of a unit that is safe to hand to application code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct CargoManifest {
    package: Option<PackageSection>,
}

#[derive(Debug, Deserialize)]
struct PackageSection {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<toml::Value>,
}

impl CompilationUnit {
    /// Read a unit from its manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestNotFound`] when the file does not exist and
    /// [`Error::Manifest`] when it cannot be parsed or has no `[package]`.
    pub fn from_manifest(manifest_path: &Path) -> Result<Self> {
        if !manifest_path.is_file() {
            let dir = manifest_path.parent().unwrap_or(manifest_path);
            return Err(Error::ManifestNotFound(dir.to_path_buf()));
        }

        let text = fs::read_to_string(manifest_path)?;
        let manifest: CargoManifest = toml::from_str(&text).map_err(|e| Error::Manifest {
            path: manifest_path.to_path_buf(),
            message: e.message().to_string(),
        })?;

        let package = manifest.package.ok_or_else(|| Error::Manifest {
            path: manifest_path.to_path_buf(),
            message: "missing [package] section".to_string(),
        })?;

        let source_path = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            name: package.name,
            description: package.description.unwrap_or_default(),
            version: package.version.map(version_string).unwrap_or_default(),
            source_path,
        })
    }

    /// Path to the unit's `Cargo.toml`.
    pub fn manifest_path(&self) -> PathBuf {
        self.source_path.join(MANIFEST_FILE)
    }

    /// Root of the unit's Rust sources.
    pub fn src_dir(&self) -> PathBuf {
        self.source_path.join("src")
    }

    /// Root of the unit's static assets.
    pub fn assets_dir(&self) -> PathBuf {
        self.source_path.join("assets")
    }

    /// The unit's readme, if it has one.
    pub fn readme_path(&self) -> Option<PathBuf> {
        README_NAMES
            .iter()
            .map(|name| self.source_path.join(name))
            .find(|path| path.is_file())
    }

    /// Name of the wasm file cargo writes for this unit.
    ///
    /// Cargo replaces dashes with underscores in library artifact names.
    pub fn artifact_stem(&self) -> String {
        self.name.replace('-', "_")
    }

    /// Directories of the unit's local path dependencies, transitively.
    ///
    /// Follows `path = ...` entries in the dependency tables, including
    /// `[target.*]` ones. `workspace = true` entries are looked up in the
    /// nearest enclosing `[workspace.dependencies]`. Manifests that cannot be
    /// read end the walk along that branch.
    pub fn local_dependencies(&self) -> Vec<PathBuf> {
        let start = canonical(&self.source_path);
        let mut seen = FxHashSet::default();
        seen.insert(start.clone());

        let mut queue = vec![start];
        let mut found = Vec::new();
        while let Some(dir) = queue.pop() {
            for dep in path_dependencies(&dir) {
                let dep = canonical(&dep);
                if seen.insert(dep.clone()) {
                    found.push(dep.clone());
                    queue.push(dep);
                }
            }
        }

        found
    }

    /// Public projection without filesystem paths.
    pub fn info(&self) -> UnitInfo {
        UnitInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
        }
    }
}

/// `version.workspace = true` has no concrete value; keep it readable.
fn version_string(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        toml::Value::Table(t) if t.contains_key("workspace") => "workspace".to_string(),
        other => other.to_string(),
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn manifest_table(dir: &Path) -> Option<toml::Table> {
    let text = fs::read_to_string(dir.join(MANIFEST_FILE)).ok()?;
    toml::from_str(&text).ok()
}

/// Direct path dependencies declared by the manifest in `dir`.
fn path_dependencies(dir: &Path) -> Vec<PathBuf> {
    let Some(manifest) = manifest_table(dir) else {
        tracing::debug!("Cannot read dependencies of {}", dir.display());
        return Vec::new();
    };

    let targets = manifest
        .get("target")
        .and_then(toml::Value::as_table)
        .into_iter()
        .flat_map(|t| t.values().filter_map(toml::Value::as_table));
    let tables = std::iter::once(&manifest)
        .chain(targets)
        .flat_map(|t| DEPENDENCY_TABLES.iter().filter_map(move |key| t.get(*key)))
        .filter_map(toml::Value::as_table);

    let mut paths = Vec::new();
    for table in tables {
        for (name, spec) in table {
            let path = match spec.get("path").and_then(toml::Value::as_str) {
                Some(path) => Some(dir.join(path)),
                None if spec.get("workspace").and_then(toml::Value::as_bool) == Some(true) => {
                    workspace_path_dependency(dir, name)
                }
                None => None,
            };
            paths.extend(path);
        }
    }
    paths
}

/// Resolve `name` against the nearest `[workspace]` manifest above `dir`.
fn workspace_path_dependency(dir: &Path, name: &str) -> Option<PathBuf> {
    for ancestor in dir.ancestors() {
        let Some(manifest) = manifest_table(ancestor) else {
            continue;
        };
        let Some(workspace) = manifest.get("workspace") else {
            continue;
        };
        let path = workspace.get("dependencies")?.get(name)?.get("path")?.as_str()?;
        return Some(ancestor.join(path));
    }
    None
}
