//! Per-cycle build context.
//!
//! A [`BuildContext`] is created at build start and owns everything later
//! hooks need: the unit list, the build report, the virtual module payload
//! and the artifact resolver. Hooks receive it by reference (the server holds
//! it in an `Arc`); nothing lives in globals, and a new cycle builds a new
//! context from a fresh scan.

use std::sync::Arc;

use crate::artifacts::ArtifactResolver;
use crate::build::{BuildReport, Mode, Orchestrator, Toolchain, UnitReport};
use crate::config::CinderConfig;
use crate::emit::{EmitReport, emit_assets, mirror_readmes};
use crate::error::Result;
use crate::paths::ProjectDirs;
use crate::scan::scan_units;
use crate::unit::CompilationUnit;
use crate::view_entry::{IMPORT_ALIAS_DIR, ViewEntryGenerator};
use crate::virtual_module::VirtualModules;

/// State of one build cycle. Immutable once started.
pub struct BuildContext {
    config: CinderConfig,
    mode: Mode,
    dirs: ProjectDirs,
    units: Arc<[CompilationUnit]>,
    orchestrator: Orchestrator,
    report: BuildReport,
    emitted: Option<EmitReport>,
    modules: VirtualModules,
    resolver: ArtifactResolver,
}

impl BuildContext {
    /// Run a full cycle with tools resolved from `PATH`.
    pub fn start(config: CinderConfig, mode: Mode) -> Result<Self> {
        let toolchain = Toolchain::detect(&config);
        Self::start_with(config, mode, toolchain)
    }

    /// Run a full cycle: scan, build, write entries, and in production
    /// emit assets.
    ///
    /// # Errors
    ///
    /// Only configuration and output-directory errors abort the cycle.
    /// Per-unit failures are recorded in [`BuildContext::report`].
    pub fn start_with(config: CinderConfig, mode: Mode, toolchain: Toolchain) -> Result<Self> {
        let mut ctx = Self::prepare(config, mode, toolchain)?;

        ctx.report = ctx.orchestrator.build_all(&ctx.units);
        let out_dir = ctx.dirs.out_dir(mode);

        if ctx.config.copy_readmes {
            mirror_readmes(&ctx.units, out_dir);
        }

        if let Some(pages_dir) = &ctx.config.pages_dir {
            let alias_dir = ctx.config.resolve(IMPORT_ALIAS_DIR);
            ViewEntryGenerator::for_output(ctx.config.resolve(pages_dir), out_dir, &alias_dir)
                .write_all(&ctx.units);
        }

        if mode == Mode::Production {
            ctx.emitted = Some(emit_assets(&ctx.units, &ctx.dirs.dist_dir));
        }

        let failed = ctx.report.failed().count();
        if failed > 0 {
            tracing::warn!("{} of {} unit(s) failed to build", failed, ctx.units.len());
        }

        Ok(ctx)
    }

    /// Scan units without building anything.
    pub fn discover(config: CinderConfig, mode: Mode) -> Result<Self> {
        let toolchain = Toolchain::from_config(&config);
        Self::prepare(config, mode, toolchain)
    }

    fn prepare(config: CinderConfig, mode: Mode, toolchain: Toolchain) -> Result<Self> {
        config.validate()?;

        let dirs = ProjectDirs::from_config(&config);
        dirs.ensure(mode)?;

        let units: Arc<[CompilationUnit]> = scan_units(&config.root, &config.crates).into();
        tracing::info!("Discovered {} unit(s) ({} mode)", units.len(), mode);

        let out_dir = dirs.out_dir(mode).clone();
        let orchestrator = Orchestrator::new(&config, toolchain, mode, out_dir.clone());
        let modules = VirtualModules::new(&units)?;
        let resolver = ArtifactResolver::new(units.clone(), out_dir, config.url_prefix());

        Ok(Self {
            config,
            mode,
            dirs,
            units,
            orchestrator,
            report: BuildReport::default(),
            emitted: None,
            modules,
            resolver,
        })
    }

    /// Rebuild one unit of this cycle, e.g. after a source change.
    ///
    /// The unit list is not rescanned.
    pub fn rebuild_unit(&self, name: &str) -> Option<UnitReport> {
        let unit = self.resolver.unit(name)?;
        let report = self.orchestrator.build_unit(unit);
        if self.config.copy_readmes {
            mirror_readmes(std::slice::from_ref(unit), self.dirs.out_dir(self.mode));
        }
        Some(report)
    }

    pub fn config(&self) -> &CinderConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dirs(&self) -> &ProjectDirs {
        &self.dirs
    }

    /// Units in scan order.
    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Asset emission result; `None` outside production.
    pub fn emitted(&self) -> Option<&EmitReport> {
        self.emitted.as_ref()
    }

    pub fn virtual_modules(&self) -> &VirtualModules {
        &self.modules
    }

    pub fn resolver(&self) -> &ArtifactResolver {
        &self.resolver
    }
}
