//! Request-path resolution for built artifacts and unit assets.
//!
//! The dev server asks an [`ArtifactResolver`] which file, if any, backs a
//! request path. Resolution is an exact name lookup into the unit set of the
//! current cycle; nothing on disk is scanned per request.
//!
//! Production output uses the same `assets/<unit>/...` convention
//! ([`asset_output_path`]), so unit code loads assets the same way in both
//! modes.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::build::ArtifactPaths;
use crate::unit::CompilationUnit;

/// Root segment for unit assets in URLs and in the production tree.
pub const ASSET_URL_ROOT: &str = "assets";

/// File name the glue module is requested under.
pub const GLUE_REQUEST: &str = "index.js";

/// Canonical sibling name of the glue module's wasm.
pub const WASM_REQUEST: &str = "index_bg.wasm";

pub const JAVASCRIPT_MIME: &str = "application/javascript";
pub const WASM_MIME: &str = "application/wasm";

/// Where a unit asset lands in the production tree.
pub fn asset_output_path(dist_dir: &Path, name: &str, relative: &Path) -> PathBuf {
    dist_dir.join(ASSET_URL_ROOT).join(name).join(relative)
}

/// A file that answers a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub unit: String,
    pub file: PathBuf,
    pub content_type: String,
}

/// Maps request paths to artifact and asset files.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    units: Arc<[CompilationUnit]>,
    index: FxHashMap<String, usize>,
    out_dir: PathBuf,
    url_prefix: String,
}

impl ArtifactResolver {
    /// Index `units` by name. `url_prefix` is matched on segment boundaries.
    pub fn new(units: Arc<[CompilationUnit]>, out_dir: PathBuf, url_prefix: &str) -> Self {
        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.name.clone(), i))
            .collect();

        Self {
            units,
            index,
            out_dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn unit(&self, name: &str) -> Option<&CompilationUnit> {
        self.index.get(name).map(|&i| &self.units[i])
    }

    /// Resolve `<prefix>/<unit>/<remainder>`.
    ///
    /// `index.js` maps to the glue, `<unit>_bg.wasm` or `index_bg.wasm` to the
    /// wasm, `assets/...` into the unit's asset tree. Anything else, or an
    /// unknown unit, is `None`.
    pub fn resolve(&self, request_path: &str) -> Option<ResolvedArtifact> {
        let path = strip_query(request_path);
        let rest = strip_segment_prefix(path, &self.url_prefix)?;
        let (name, remainder) = rest.split_once('/')?;
        let unit = self.unit(name)?;
        let artifacts = ArtifactPaths::new(&self.out_dir, &unit.name);

        if remainder == GLUE_REQUEST {
            return Some(ResolvedArtifact {
                unit: unit.name.clone(),
                file: artifacts.glue,
                content_type: JAVASCRIPT_MIME.to_string(),
            });
        }

        if remainder == WASM_REQUEST || remainder == format!("{}_bg.wasm", unit.name) {
            return Some(ResolvedArtifact {
                unit: unit.name.clone(),
                file: artifacts.wasm,
                content_type: WASM_MIME.to_string(),
            });
        }

        let asset = remainder.strip_prefix(ASSET_URL_ROOT)?.strip_prefix('/')?;
        resolve_asset(unit, asset)
    }

    /// Resolve the dev alias `/assets/<unit>/<rest>` onto the unit's asset
    /// directory, so no copy is needed while serving.
    pub fn resolve_alias(&self, request_path: &str) -> Option<ResolvedArtifact> {
        let path = strip_query(request_path);
        let rest = strip_segment_prefix(path, &format!("/{ASSET_URL_ROOT}"))?;
        let (name, asset) = rest.split_once('/')?;
        let unit = self.unit(name)?;
        resolve_asset(unit, asset)
    }
}

fn resolve_asset(unit: &CompilationUnit, asset: &str) -> Option<ResolvedArtifact> {
    let relative = safe_relative(asset)?;
    let content_type = mime_guess::from_path(&relative)
        .first_or_octet_stream()
        .to_string();

    Some(ResolvedArtifact {
        unit: unit.name.clone(),
        file: unit.assets_dir().join(relative),
        content_type,
    })
}

/// Accept only plain relative components; `..`, roots and empty paths fail.
fn safe_relative(path: &str) -> Option<PathBuf> {
    if path.is_empty() || path.contains('\\') {
        return None;
    }
    let relative = Path::new(path);
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// `"/wasm/snake/index.js"` with prefix `"/wasm"` → `"snake/index.js"`.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return path.strip_prefix('/');
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}
