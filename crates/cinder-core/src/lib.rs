//! Core engine for Cinder.
//!
//! Cinder builds a set of Rust crates ("units") to browser-loadable wasm
//! modules and delivers them to a web application. This crate provides:
//! - Unit discovery from manifest patterns
//! - Staleness detection against prior artifacts
//! - Build orchestration (cargo, wasm-bindgen, wasm-opt) with per-unit isolation
//! - Request-path resolution for dev serving and production asset emission
//! - The virtual module listing discovered units
//! - Generated view entries for the page router
//!
//! A build cycle is represented by a [`BuildContext`].

pub mod artifacts;
pub mod build;
pub mod config;
pub mod context;
pub mod emit;
pub mod error;
pub mod paths;
pub mod scan;
pub mod unit;
pub mod view_entry;
pub mod virtual_module;

pub use artifacts::{ArtifactResolver, ResolvedArtifact};
pub use build::{BuildReport, Mode, Orchestrator, Stage, Toolchain, UnitReport};
pub use config::CinderConfig;
pub use context::BuildContext;
pub use emit::{EmitReport, emit_assets};
pub use error::{Error, Result};
pub use paths::ProjectDirs;
pub use scan::scan_units;
pub use unit::{CompilationUnit, UnitInfo};
pub use view_entry::{EntryStatus, ViewEntryGenerator};
pub use virtual_module::{GENERATED_WASMS_ID, VirtualModules};
