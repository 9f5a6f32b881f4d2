//! Build pipeline for wasm units.
//!
//! This module provides:
//! - Structured external commands with timeouts ([`CommandSpec`], [`ProcessRunner`])
//! - Toolchain discovery and command construction ([`Toolchain`])
//! - Staleness detection against prior artifacts ([`should_rebuild`])
//! - Per-unit orchestration on a bounded pool ([`Orchestrator`])
//!
//! # Architecture
//!
//! ```text
//! CompilationUnit
//!     │
//!     ├── should_rebuild? ──► Fresh ──────────────────────────┐
//!     │                                                        │
//!     └── Rebuild ──► cargo build ──► wasm-bindgen ──► wasm-opt (release, optional)
//!                          │               │
//!                          └─ failure is reported, bindgen still runs
//! ```

mod command;
mod orchestrator;
mod staleness;
mod toolchain;
mod types;

pub use command::{CommandSpec, ProcessOutput, ProcessRunner, StreamMode};
pub use orchestrator::Orchestrator;
pub use staleness::{Staleness, StaleReason, should_rebuild, should_rebuild_with};
pub use toolchain::Toolchain;
pub use types::{ArtifactPaths, BuildReport, Mode, Stage, StageReport, UnitReport};
