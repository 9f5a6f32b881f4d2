//! View entry generation.
//!
//! Writes one `<pages_dir>/<unit>.vue` page per unit for the routing layer.
//! File names and import paths depend only on the unit name and location, and
//! files are rewritten only when their content changes, so regeneration does
//! not churn the router's link table.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::Result;
use crate::unit::CompilationUnit;

/// Default import root for generated bindings (`~/wasm/<unit>`).
pub const DEFAULT_IMPORT_ROOT: &str = "~/wasm";

/// Directory behind the application's `~` import alias, relative to the
/// project root.
pub const IMPORT_ALIAS_DIR: &str = "src";

/// What happened to an entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Created,
    Updated,
    Unchanged,
}

/// Writes view entries for units.
#[derive(Debug, Clone)]
pub struct ViewEntryGenerator {
    pages_dir: PathBuf,
    import_root: String,
}

impl ViewEntryGenerator {
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            import_root: DEFAULT_IMPORT_ROOT.to_string(),
        }
    }

    /// Generator importing bindings from `out_dir`.
    ///
    /// An output dir under `alias_dir` is imported through the `~/` alias
    /// (`src/wasm_dist` → `~/wasm_dist`); any other is imported relative to
    /// the pages dir.
    pub fn for_output(pages_dir: impl Into<PathBuf>, out_dir: &Path, alias_dir: &Path) -> Self {
        let pages_dir = pages_dir.into();
        let import_root = match out_dir.strip_prefix(alias_dir) {
            Ok(rel) => {
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("~/{}", parts.join("/"))
            }
            Err(_) => relative_import(&pages_dir, out_dir),
        };
        Self::new(pages_dir).with_import_root(import_root)
    }

    /// Override the module root bindings are imported from.
    pub fn with_import_root(mut self, root: impl Into<String>) -> Self {
        self.import_root = root.into().trim_end_matches('/').to_string();
        self
    }

    /// Path of the entry for `unit`.
    pub fn entry_path(&self, unit: &CompilationUnit) -> PathBuf {
        self.pages_dir.join(format!("{}.vue", unit.name))
    }

    /// Write entries for all units. A failing unit is logged and skipped.
    pub fn write_all(&self, units: &[CompilationUnit]) -> Vec<(String, Result<EntryStatus>)> {
        units
            .iter()
            .map(|unit| {
                let status = self.write(unit);
                match &status {
                    Ok(EntryStatus::Unchanged) => {}
                    Ok(s) => tracing::debug!(unit = %unit.name, "View entry {:?}", s),
                    Err(e) => tracing::error!(unit = %unit.name, "Cannot write view entry: {}", e),
                }
                (unit.name.clone(), status)
            })
            .collect()
    }

    /// Write the entry for one unit if its content changed.
    pub fn write(&self, unit: &CompilationUnit) -> Result<EntryStatus> {
        let path = self.entry_path(unit);
        let content = self.render(unit);

        let status = match fs::read_to_string(&path) {
            Ok(existing) if existing == content => return Ok(EntryStatus::Unchanged),
            Ok(_) => EntryStatus::Updated,
            Err(_) => EntryStatus::Created,
        };

        fs::create_dir_all(&self.pages_dir)?;
        fs::write(&path, content)?;
        Ok(status)
    }

    /// Render the entry source for a unit.
    pub fn render(&self, unit: &CompilationUnit) -> String {
        let ident = js_ident(&unit.name);
        let readme = unit
            .readme_path()
            .map(|p| relative_import(&self.pages_dir, &p));

        let mut out = String::new();
        out.push_str("<script setup lang=\"ts\">\n");
        if let Some(readme) = &readme {
            out.push_str(&format!("import {ident}Readme from '{readme}'\n"));
        }
        out.push_str(&format!("import init from '{}/{}'\n", self.import_root, unit.name));
        out.push_str(
            "\nconst gpu = (navigator as any).gpu\n\
             \n\
             onMounted(async () => {\n\
             \x20 if (gpu) {\n\
             \x20   const wasm = await init()\n\
             \x20   wasm.run()\n\
             \x20 }\n\
             })\n\
             \n\
             const router = useRouter()\n\
             </script>\n\n",
        );

        out.push_str("<template>\n  <div>\n");
        out.push_str(
            "    <p v-if=\"!gpu\" class=\"text-sm mt-4\">\n\
             \x20     WebGPU is not available in this browser.\n\
             \x20   </p>\n\
             \x20   <canvas v-else class=\"wasm\" />\n",
        );
        if readme.is_some() {
            out.push_str(&format!("    <{ident}Readme />\n"));
        }
        out.push_str(
            "    <button class=\"btn m-3 text-sm mt-6\" @click=\"router.back()\">\n\
             \x20     Back\n\
             \x20   </button>\n\
             \x20 </div>\n\
             </template>\n\n",
        );

        out.push_str("<route lang=\"yaml\">\nmeta:\n  layout: wasm\n</route>\n");
        out
    }
}

/// `tic-tac-toe` → `tic_tac_toe`; a leading digit gets an underscore.
fn js_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Import specifier for `target` as seen from files in `from_dir`.
fn relative_import(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = target.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat_n("..".to_string(), from.len() - common));
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}
