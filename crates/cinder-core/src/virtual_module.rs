//! Virtual module exposing unit metadata to application code.
//!
//! Application code imports [`GENERATED_WASMS_ID`] and receives
//!
//! ```js
//! export const wasm_crates = [{"name":"snake","description":"...","version":"0.1.0"}];
//! ```
//!
//! The payload is rendered once per build cycle from the cycle's units and
//! never contains filesystem paths.

use crate::error::Result;
use crate::unit::{CompilationUnit, UnitInfo};

/// Namespace reserved for cinder's virtual modules.
pub const VIRTUAL_PREFIX: &str = "virtual:cinder/";

/// Module listing the discovered units.
pub const GENERATED_WASMS_ID: &str = "virtual:cinder/generated-wasms";

/// Marker prepended to resolved ids so no other resolver claims them.
pub const RESOLVED_MARKER: char = '\0';

/// Resolves and loads cinder's virtual modules for one cycle.
#[derive(Debug, Clone)]
pub struct VirtualModules {
    generated_wasms: String,
}

impl VirtualModules {
    /// Render the payload for `units`, in their given order.
    pub fn new(units: &[CompilationUnit]) -> Result<Self> {
        let infos: Vec<UnitInfo> = units.iter().map(CompilationUnit::info).collect();
        let json = serde_json::to_string(&infos)?;
        Ok(Self {
            generated_wasms: format!("export const wasm_crates = {json};\n"),
        })
    }

    /// Claim ids in the reserved namespace.
    ///
    /// Returns the resolved id, or `None` for ids this provider does not own.
    pub fn resolve_id(&self, id: &str) -> Option<String> {
        id.starts_with(VIRTUAL_PREFIX)
            .then(|| format!("{RESOLVED_MARKER}{id}"))
    }

    /// Source text for a resolved id.
    ///
    /// Unresolved ids (without the marker) are accepted too, for callers that
    /// skip the resolve step. Unknown ids inside the namespace yield `None`.
    pub fn load(&self, id: &str) -> Option<&str> {
        let id = id.strip_prefix(RESOLVED_MARKER).unwrap_or(id);
        if id == GENERATED_WASMS_ID {
            tracing::debug!("Load {}", id);
            Some(&self.generated_wasms)
        } else {
            None
        }
    }

    /// The rendered unit list module.
    pub fn generated_wasms(&self) -> &str {
        &self.generated_wasms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn units() -> Vec<CompilationUnit> {
        vec![
            CompilationUnit {
                name: "alpha".to_string(),
                description: "First \"demo\"".to_string(),
                version: "0.1.0".to_string(),
                source_path: PathBuf::from("/home/dev/secret-project/crates/alpha"),
            },
            CompilationUnit {
                name: "beta".to_string(),
                description: String::new(),
                version: "0.2.0".to_string(),
                source_path: PathBuf::from("C:\\work\\beta"),
            },
        ]
    }

    #[test]
    fn test_payload() {
        let modules = VirtualModules::new(&units()).unwrap();
        assert_eq!(
            modules.generated_wasms(),
            "export const wasm_crates = [\
             {\"name\":\"alpha\",\"description\":\"First \\\"demo\\\"\",\"version\":\"0.1.0\"},\
             {\"name\":\"beta\",\"description\":\"\",\"version\":\"0.2.0\"}];\n"
        );
    }

    #[test]
    fn test_no_paths_leak() {
        let modules = VirtualModules::new(&units()).unwrap();
        let text = modules.generated_wasms();
        for unit in units() {
            assert!(!text.contains(&*unit.source_path.to_string_lossy()));
        }
        assert!(!text.contains("secret-project"));
        assert!(!text.contains("source_path"));
    }

    #[test]
    fn test_resolve_and_load() {
        let modules = VirtualModules::new(&units()).unwrap();

        let resolved = modules.resolve_id(GENERATED_WASMS_ID).unwrap();
        assert!(resolved.starts_with('\0'));
        assert_eq!(modules.load(&resolved), Some(modules.generated_wasms()));
        assert_eq!(modules.load(GENERATED_WASMS_ID), modules.load(&resolved));

        let other = modules.resolve_id("virtual:cinder/snake").unwrap();
        assert!(modules.load(&other).is_none());

        assert!(modules.resolve_id("vue").is_none());
        assert!(modules.resolve_id("./main.ts").is_none());
    }

    #[test]
    fn test_empty_unit_set() {
        let modules = VirtualModules::new(&[]).unwrap();
        assert_eq!(modules.generated_wasms(), "export const wasm_crates = [];\n");
    }
}
