//! Unit discovery.
//!
//! Expands the configured glob patterns into [`CompilationUnit`]s. Patterns
//! are relative to the project root and matched with `globset`, where `*`
//! stays within one path component and `**` crosses any number of them:
//!
//! - `crates/*`, `crates/s*`: matching directories are unit dirs
//! - `crates/**/Cargo.toml`: every manifest below `crates/`
//! - `crates/**`: shorthand for `crates/**/Cargo.toml`
//! - `crates/snake` or `crates/snake/Cargo.toml`: one unit
//!
//! Hidden directories, `target` and `node_modules` are never entered.
//! Patterns are expanded on every call; nothing is cached.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use rustc_hash::{FxHashMap, FxHashSet};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;
use crate::unit::{CompilationUnit, MANIFEST_FILE};

/// Expand `patterns` and read every manifest found.
///
/// Candidates without a manifest, and manifests that fail to parse, are
/// logged and skipped. A manifest matched by more than one pattern is read
/// once. Units whose name was already taken by an earlier unit are dropped
/// (see [`dedupe_units`]).
pub fn scan_units(root: &Path, patterns: &[String]) -> Vec<CompilationUnit> {
    let mut units = Vec::new();
    let mut visited = FxHashSet::default();

    for pattern in patterns {
        for manifest in expand_pattern(root, pattern) {
            if !visited.insert(manifest.clone()) {
                continue;
            }
            match CompilationUnit::from_manifest(&manifest) {
                Ok(unit) => {
                    tracing::debug!(unit = %unit.name, "Found {}", manifest.display());
                    units.push(unit);
                }
                Err(e) => tracing::warn!("Skipping {}: {}", manifest.display(), e),
            }
        }
    }

    dedupe_units(units)
}

/// Drop units whose name was already seen.
///
/// The first unit in scan order keeps the name; each later duplicate is
/// rejected with an error diagnostic naming both manifests.
pub fn dedupe_units(units: Vec<CompilationUnit>) -> Vec<CompilationUnit> {
    let mut seen: FxHashMap<String, PathBuf> = FxHashMap::default();
    let mut kept = Vec::with_capacity(units.len());

    for unit in units {
        if let Some(first) = seen.get(&unit.name) {
            let err = Error::DuplicateUnit {
                name: unit.name.clone(),
                first: first.clone(),
                duplicate: unit.manifest_path(),
            };
            tracing::error!("{}", err);
            continue;
        }
        seen.insert(unit.name.clone(), unit.manifest_path());
        kept.push(unit);
    }

    kept
}

/// Expand one pattern to candidate manifest paths, sorted within the pattern.
///
/// Directory candidates map to `<dir>/Cargo.toml` whether or not it exists,
/// so the missing manifest is reported by the reader.
fn expand_pattern(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let pattern = normalize_pattern(pattern);
    if pattern.is_empty() {
        tracing::warn!("Ignoring empty unit pattern");
        return Vec::new();
    }

    if !contains_glob_magic(&pattern) {
        let path = root.join(&pattern);
        return if path.file_name().is_some_and(|n| n == MANIFEST_FILE) {
            vec![path]
        } else {
            vec![path.join(MANIFEST_FILE)]
        };
    }

    let matcher = match compile_pattern(&pattern) {
        Ok(matcher) => matcher,
        Err(e) => {
            tracing::warn!("Invalid unit pattern '{}': {}", pattern, e);
            return Vec::new();
        }
    };

    let (prefix, rest) = split_literal_prefix(&pattern);
    let base = root.join(prefix);
    let mut walker = WalkDir::new(&base).min_depth(1).sort_by_file_name();
    if !rest.contains("**") {
        walker = walker.max_depth(rest.split('/').count());
    }

    let mut manifests = Vec::new();
    let entries = walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored_dir(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("Cannot read {}: {}", base.display(), err);
                None
            }
        });

    for entry in entries {
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !matcher.is_match(rel) {
            continue;
        }
        if entry.file_type().is_dir() {
            manifests.push(entry.path().join(MANIFEST_FILE));
        } else if entry.file_name() == MANIFEST_FILE {
            manifests.push(entry.into_path());
        }
    }

    manifests
}

/// Trim whitespace, a leading `./` and trailing slashes; a trailing `**`
/// means every manifest below it.
fn normalize_pattern(pattern: &str) -> String {
    let mut pattern = pattern.trim();
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    let pattern = pattern.trim_end_matches('/');

    if pattern == "**" || pattern.ends_with("/**") {
        format!("{pattern}/{MANIFEST_FILE}")
    } else {
        pattern.to_string()
    }
}

fn contains_glob_magic(pattern: &str) -> bool {
    pattern
        .chars()
        .any(|ch| matches!(ch, '*' | '?' | '[' | ']' | '{' | '}'))
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// `"crates/games/*/Cargo.toml"` → `("crates/games", "*/Cargo.toml")`.
fn split_literal_prefix(pattern: &str) -> (&str, &str) {
    let mut offset = 0;
    for component in pattern.split('/') {
        if contains_glob_magic(component) {
            break;
        }
        offset += component.len() + 1;
    }
    if offset == 0 {
        ("", pattern)
    } else {
        (&pattern[..offset - 1], &pattern[offset..])
    }
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || name == "target" || name == "node_modules"
    }
}
