//! Per-unit build orchestration.
//!
//! Runs compiler, binding generator and optimizer for each unit. Unit builds
//! are independent: a failure is logged with the unit and stage, recorded in
//! the report, and never stops other units.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::CinderConfig;
use crate::error::Error;
use crate::unit::CompilationUnit;

use super::command::{CommandSpec, ProcessRunner, StreamMode};
use super::staleness::{StaleReason, Staleness, should_rebuild_with};
use super::toolchain::Toolchain;
use super::types::{ArtifactPaths, BuildReport, Mode, Stage, StageReport, UnitReport};

/// Workspace lockfile, an input of every unit when present.
const LOCKFILE: &str = "Cargo.lock";

/// Builds units for one mode.
pub struct Orchestrator {
    toolchain: Toolchain,
    runner: ProcessRunner,
    mode: Mode,
    out_dir: PathBuf,
    jobs: usize,
    incremental: bool,
    optimize: bool,
    lockfile: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator writing bindings to `out_dir`.
    ///
    /// With more than one job, child output is captured and forwarded per
    /// invocation; with one job it is passed straight through.
    pub fn new(config: &CinderConfig, toolchain: Toolchain, mode: Mode, out_dir: PathBuf) -> Self {
        let streams = if config.jobs > 1 {
            StreamMode::Capture
        } else {
            StreamMode::Inherit
        };

        Self {
            toolchain,
            runner: ProcessRunner::new(config.timeout(), streams),
            mode,
            out_dir,
            jobs: config.jobs.max(1),
            incremental: config.incremental,
            optimize: config.optimize && mode.is_release(),
            lockfile: config.resolve(LOCKFILE),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Build every unit, at most `jobs` at a time. Reports keep input order.
    pub fn build_all(&self, units: &[CompilationUnit]) -> BuildReport {
        if self.jobs == 1 || units.len() < 2 {
            return BuildReport {
                units: units.iter().map(|u| self.build_unit(u)).collect(),
            };
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("cinder-build-{i}"))
            .build();

        let units = match pool {
            Ok(pool) => pool.install(|| units.par_iter().map(|u| self.build_unit(u)).collect()),
            Err(e) => {
                tracing::warn!("Failed to create build pool, building sequentially: {}", e);
                units.iter().map(|u| self.build_unit(u)).collect()
            }
        };

        BuildReport { units }
    }

    /// Build one unit.
    ///
    /// With incremental builds enabled, a fresh artifact skips compiler and
    /// bindgen; only the optimizer hook runs. Freshness covers the unit's
    /// manifest and sources, its local path dependencies and the lockfile.
    pub fn build_unit(&self, unit: &CompilationUnit) -> UnitReport {
        let staleness = if self.incremental {
            self.staleness(unit)
        } else {
            Staleness::Rebuild(StaleReason::Forced)
        };

        let report = staleness.dispatch(
            |reason| {
                tracing::info!(unit = %unit.name, "Building ({}, {})", self.mode, reason);
                let mut report = UnitReport::new(&unit.name);
                report.rebuild_reason = Some(reason);
                self.rebuild(unit, &mut report);
                report
            },
            || {
                tracing::info!(unit = %unit.name, "Up to date");
                let mut report = UnitReport::new(&unit.name);
                report.skipped_fresh = true;
                self.optimize_if_enabled(unit, &mut report);
                report
            },
        );

        if report.succeeded() {
            tracing::info!(unit = %unit.name, "Build finished");
        }

        report
    }

    fn staleness(&self, unit: &CompilationUnit) -> Staleness {
        let artifacts = ArtifactPaths::new(&self.out_dir, &unit.name);
        let mut inputs = unit.local_dependencies();
        if self.lockfile.is_file() {
            inputs.push(self.lockfile.clone());
        }
        should_rebuild_with(&unit.manifest_path(), &unit.src_dir(), &inputs, &artifacts.wasm)
    }

    fn rebuild(&self, unit: &CompilationUnit, report: &mut UnitReport) {
        let compile = self.toolchain.compile_command(unit, self.mode);
        report.stages.push(self.run_stage(unit, Stage::Compile, &compile));

        // Bindgen runs even after a failed compile; it then works on whatever
        // wasm is on disk and reports its own failure if there is none.
        let wasm = self.toolchain.compiled_wasm(unit, self.mode);
        if !wasm.exists() {
            tracing::warn!(unit = %unit.name, "No compiled wasm at {}", wasm.display());
        }
        let bindgen = self.toolchain.bindgen_command(unit, self.mode, &self.out_dir);
        let bindgen = self.run_stage(unit, Stage::Bindgen, &bindgen);
        let bindgen_ok = bindgen.succeeded();
        report.stages.push(bindgen);

        if bindgen_ok {
            self.optimize_if_enabled(unit, report);
        }
    }

    fn optimize_if_enabled(&self, unit: &CompilationUnit, report: &mut UnitReport) {
        if !self.optimize {
            return;
        }
        let cmd = self.toolchain.optimize_command(unit, &self.out_dir);
        report.stages.push(self.run_stage(unit, Stage::Optimize, &cmd));
    }

    fn run_stage(&self, unit: &CompilationUnit, stage: Stage, cmd: &CommandSpec) -> StageReport {
        tracing::debug!(unit = %unit.name, stage = %stage, "{}", cmd);

        let result = match self.runner.run(cmd) {
            Err(e) => Err(Error::Spawn {
                unit: unit.name.clone(),
                stage,
                program: cmd.program_name(),
                message: e.to_string(),
            }),
            Ok(output) if output.timed_out() => Err(Error::Timeout {
                unit: unit.name.clone(),
                stage,
                secs: self.runner.timeout().as_secs(),
            }),
            Ok(output) if !output.success() => Err(Error::ProcessFailed {
                unit: unit.name.clone(),
                stage,
                code: output.code(),
            }),
            Ok(_) => Ok(()),
        };

        if let Err(e) = &result {
            tracing::error!(unit = %unit.name, stage = %stage, "{}", e);
        }

        StageReport { stage, result }
    }
}
