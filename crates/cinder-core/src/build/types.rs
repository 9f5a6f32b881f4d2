//! Common types for the build pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;

use super::staleness::StaleReason;

/// Build profile for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dev server: debug profile, artifacts served from their build location.
    Development,
    /// Release profile, assets emitted into the output tree.
    Production,
}

impl Mode {
    /// Cargo profile directory under `target/<triple>/`.
    pub fn profile_dir(self) -> &'static str {
        match self {
            Mode::Development => "debug",
            Mode::Production => "release",
        }
    }

    pub fn is_release(self) -> bool {
        self == Mode::Production
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

/// One external step of a unit build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Compile,
    Bindgen,
    Optimize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Compile => f.write_str("compile"),
            Stage::Bindgen => f.write_str("bindgen"),
            Stage::Optimize => f.write_str("optimize"),
        }
    }
}

/// Files produced for a unit in one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// JS glue written by the binding generator.
    pub glue: PathBuf,
    /// Wasm module written by the binding generator.
    pub wasm: PathBuf,
    /// Size-optimized module written by `wasm-opt`.
    pub optimized: PathBuf,
}

impl ArtifactPaths {
    pub fn new(out_dir: &Path, name: &str) -> Self {
        Self {
            glue: out_dir.join(format!("{name}.js")),
            wasm: out_dir.join(format!("{name}_bg.wasm")),
            optimized: out_dir.join(format!("{name}.wasm")),
        }
    }
}

/// Outcome of one stage.
#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub result: Result<(), Error>,
}

impl StageReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of one unit build.
#[derive(Debug)]
pub struct UnitReport {
    /// Unit name.
    pub name: String,

    /// Stages in the order they ran.
    pub stages: Vec<StageReport>,

    /// Compiler and bindgen were skipped because artifacts were fresh.
    pub skipped_fresh: bool,

    /// Why compiler and bindgen ran; `None` for fresh units.
    pub rebuild_reason: Option<StaleReason>,
}

impl UnitReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            skipped_fresh: false,
            rebuild_reason: None,
        }
    }

    /// Every stage that ran succeeded.
    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(StageReport::succeeded)
    }

    /// Result of a given stage, if it ran.
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// First failing stage.
    pub fn failure(&self) -> Option<&StageReport> {
        self.stages.iter().find(|s| !s.succeeded())
    }
}

/// Outcome of a whole cycle, in scan order.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub units: Vec<UnitReport>,
}

impl BuildReport {
    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| !u.succeeded())
    }

    pub fn all_succeeded(&self) -> bool {
        self.units.iter().all(UnitReport::succeeded)
    }
}
