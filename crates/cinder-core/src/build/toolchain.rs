//! Toolchain discovery and command construction.
//!
//! Knows the argument conventions of `cargo`, `wasm-bindgen` and `wasm-opt`.

use std::path::{Path, PathBuf};

use crate::config::CinderConfig;
use crate::unit::CompilationUnit;

use super::command::CommandSpec;
use super::types::{ArtifactPaths, Mode};

/// Target environment passed to `wasm-bindgen`.
const BINDGEN_TARGET: &str = "web";

/// External tools used to build units.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Cargo program.
    cargo: PathBuf,

    /// wasm-bindgen CLI.
    wasm_bindgen: PathBuf,

    /// Binaryen optimizer.
    wasm_opt: PathBuf,

    /// Target triple for unit builds.
    target_triple: String,

    /// Cargo target directory (absolute).
    target_dir: PathBuf,

    /// Working directory for cargo.
    root: PathBuf,
}

impl Toolchain {
    /// Build a toolchain from configuration without checking `PATH`.
    pub fn from_config(config: &CinderConfig) -> Self {
        Self {
            cargo: PathBuf::from(&config.toolchain.cargo),
            wasm_bindgen: PathBuf::from(&config.toolchain.wasm_bindgen),
            wasm_opt: PathBuf::from(&config.toolchain.wasm_opt),
            target_triple: config.target_triple.clone(),
            target_dir: config.resolve(&config.target_dir),
            root: config.root.clone(),
        }
    }

    /// Build a toolchain and resolve each program through `PATH`.
    ///
    /// Missing tools are logged, not fatal: the affected stage then fails per
    /// unit and is reported like any other stage failure.
    pub fn detect(config: &CinderConfig) -> Self {
        let mut toolchain = Self::from_config(config);
        toolchain.cargo = Self::locate(&toolchain.cargo, &config.root, true);
        toolchain.wasm_bindgen = Self::locate(&toolchain.wasm_bindgen, &config.root, true);
        toolchain.wasm_opt = Self::locate(&toolchain.wasm_opt, &config.root, config.optimize);
        toolchain
    }

    fn locate(program: &Path, root: &Path, required: bool) -> PathBuf {
        match which::which_in(program, std::env::var_os("PATH"), root) {
            Ok(path) => path,
            Err(_) => {
                if required {
                    tracing::warn!("{} not found in PATH", program.display());
                }
                program.to_path_buf()
            }
        }
    }

    /// Path cargo writes the unit's wasm to.
    pub fn compiled_wasm(&self, unit: &CompilationUnit, mode: Mode) -> PathBuf {
        self.target_dir
            .join(&self.target_triple)
            .join(mode.profile_dir())
            .join(format!("{}.wasm", unit.artifact_stem()))
    }

    /// `cargo build --lib --package <name> --target <triple> [--release]`
    pub fn compile_command(&self, unit: &CompilationUnit, mode: Mode) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cargo)
            .args(["build", "--lib", "--package"])
            .arg(&unit.name)
            .arg("--target")
            .arg(&self.target_triple)
            .current_dir(&self.root);

        if mode.is_release() {
            cmd = cmd.arg("--release");
        }

        cmd
    }

    /// `wasm-bindgen <wasm> --out-dir <dir> --out-name <name> --target web`
    pub fn bindgen_command(
        &self,
        unit: &CompilationUnit,
        mode: Mode,
        out_dir: &Path,
    ) -> CommandSpec {
        CommandSpec::new(&self.wasm_bindgen)
            .arg(self.compiled_wasm(unit, mode))
            .arg("--out-dir")
            .arg(out_dir)
            .arg("--out-name")
            .arg(&unit.name)
            .args(["--target", BINDGEN_TARGET])
            .current_dir(&self.root)
    }

    /// `wasm-opt -Os --enable-simd --output <dir>/<name>.wasm <dir>/<name>_bg.wasm`
    pub fn optimize_command(&self, unit: &CompilationUnit, out_dir: &Path) -> CommandSpec {
        let paths = ArtifactPaths::new(out_dir, &unit.name);
        CommandSpec::new(&self.wasm_opt)
            .args(["-Os", "--enable-simd", "--output"])
            .arg(paths.optimized)
            .arg(paths.wasm)
            .current_dir(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str) -> CompilationUnit {
        CompilationUnit {
            name: name.to_string(),
            description: String::new(),
            version: "0.1.0".to_string(),
            source_path: PathBuf::from("/project/crates").join(name),
        }
    }

    fn toolchain() -> Toolchain {
        Toolchain::from_config(&CinderConfig {
            root: PathBuf::from("/project"),
            ..Default::default()
        })
    }

    #[test]
    fn test_compile_command() {
        let tc = toolchain();
        let dev = tc.compile_command(&unit("snake"), Mode::Development);
        assert_eq!(dev.program_name(), "cargo");
        assert_eq!(
            dev.arg_strings(),
            ["build", "--lib", "--package", "snake", "--target", "wasm32-unknown-unknown"]
        );
        assert_eq!(dev.cwd.as_deref(), Some(Path::new("/project")));

        let release = tc.compile_command(&unit("snake"), Mode::Production);
        assert_eq!(release.arg_strings().last().map(String::as_str), Some("--release"));
    }

    #[test]
    fn test_bindgen_command() {
        let tc = toolchain();
        let cmd = tc.bindgen_command(
            &unit("tic-tac-toe"),
            Mode::Production,
            Path::new("/project/src/wasm_dist"),
        );
        assert_eq!(
            cmd.arg_strings(),
            [
                "/project/target/wasm32-unknown-unknown/release/tic_tac_toe.wasm",
                "--out-dir",
                "/project/src/wasm_dist",
                "--out-name",
                "tic-tac-toe",
                "--target",
                "web",
            ]
        );
    }

    #[test]
    fn test_optimize_command() {
        let tc = toolchain();
        let cmd = tc.optimize_command(&unit("boids"), Path::new("/dist"));
        assert_eq!(cmd.program_name(), "wasm-opt");
        assert_eq!(
            cmd.arg_strings(),
            ["-Os", "--enable-simd", "--output", "/dist/boids.wasm", "/dist/boids_bg.wasm"]
        );
    }
}
