//! Staleness detection for unit artifacts.
//!
//! Compares modification times of a unit's manifest, its source tree and any
//! extra inputs (local path dependencies, the lockfile) against a previously
//! produced artifact. Every uncertainty resolves to a rebuild.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

/// Why a rebuild is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No prior artifact, or its mtime is unreadable.
    ArtifactMissing,
    /// The manifest changed after the artifact was written.
    ManifestChanged,
    /// A source entry changed after the artifact was written.
    SourceChanged(String),
    /// A local dependency or the lockfile changed after the artifact.
    DependencyChanged(String),
    /// Incremental builds are off; every unit is rebuilt.
    Forced,
    /// The check itself failed.
    CheckFailed(String),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::ArtifactMissing => f.write_str("no prior artifact"),
            StaleReason::ManifestChanged => f.write_str("manifest changed"),
            StaleReason::SourceChanged(path) => write!(f, "{path} changed"),
            StaleReason::DependencyChanged(path) => write!(f, "dependency {path} changed"),
            StaleReason::Forced => f.write_str("incremental builds disabled"),
            StaleReason::CheckFailed(msg) => write!(f, "staleness check failed: {msg}"),
        }
    }
}

/// Decision produced by [`should_rebuild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Rebuild(StaleReason),
    Fresh,
}

impl Staleness {
    /// Invoke exactly one of two hooks.
    ///
    /// `on_rebuild` runs for every rebuild decision; `on_fresh` only when the
    /// artifact was proven newer than all inputs.
    pub fn dispatch<T>(
        self,
        on_rebuild: impl FnOnce(StaleReason) -> T,
        on_fresh: impl FnOnce() -> T,
    ) -> T {
        match self {
            Staleness::Rebuild(reason) => on_rebuild(reason),
            Staleness::Fresh => on_fresh(),
        }
    }
}

/// Decide whether `artifact` must be rebuilt from `manifest` and `source_root`.
///
/// The source walk includes directories and stops at the first entry newer
/// than the artifact. Filesystem errors, including a missing source root,
/// force a rebuild.
pub fn should_rebuild(manifest: &Path, source_root: &Path, artifact: &Path) -> Staleness {
    should_rebuild_with(manifest, source_root, &[], artifact)
}

/// [`should_rebuild`] with extra inputs.
///
/// Each entry of `dependencies` is a file or a directory. Directories are
/// walked like the source root, skipping hidden dirs and `target`. A
/// dependency that cannot be read forces a rebuild.
pub fn should_rebuild_with(
    manifest: &Path,
    source_root: &Path,
    dependencies: &[PathBuf],
    artifact: &Path,
) -> Staleness {
    let Some(artifact_time) = mtime(artifact) else {
        return Staleness::Rebuild(StaleReason::ArtifactMissing);
    };

    match mtime(manifest) {
        Some(t) if t > artifact_time => return Staleness::Rebuild(StaleReason::ManifestChanged),
        Some(_) => {}
        None => {
            return Staleness::Rebuild(StaleReason::CheckFailed(format!(
                "cannot read {}",
                manifest.display()
            )));
        }
    }

    if let Err(reason) = newest_entry(source_root, artifact_time, StaleReason::SourceChanged) {
        return Staleness::Rebuild(reason);
    }

    for dependency in dependencies {
        if let Err(reason) = newest_entry(dependency, artifact_time, StaleReason::DependencyChanged)
        {
            return Staleness::Rebuild(reason);
        }
    }

    Staleness::Fresh
}

/// Walk `root` and fail with `changed(path)` at the first entry newer than
/// `artifact_time`.
fn newest_entry(
    root: &Path,
    artifact_time: SystemTime,
    changed: fn(String) -> StaleReason,
) -> Result<(), StaleReason> {
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_build_dir(e));

    for entry in walker {
        let entry = entry.map_err(|e| StaleReason::CheckFailed(e.to_string()))?;
        let modified = entry
            .metadata()
            .map_err(|e| StaleReason::CheckFailed(e.to_string()))?
            .modified()
            .map_err(|e| StaleReason::CheckFailed(e.to_string()))?;

        if modified > artifact_time {
            return Err(changed(entry.path().display().to_string()));
        }
    }

    Ok(())
}

fn is_build_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || name == "target"
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
