//! Build command implementation for Cinder CLI.
//!
//! Runs one build cycle and reports per-unit results.

use std::path::Path;
use std::time::Instant;

use cinder_core::{BuildContext, BuildReport, EmitReport, Mode};

use crate::{colors, project};

/// Build every unit. Fails if any unit or asset copy failed.
pub fn execute(root: &Path, jobs: Option<usize>, dev: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = project::load(root, jobs)?;
    let mode = if dev { Mode::Development } else { Mode::Production };

    project::print_header(&format!("Building ({mode})"), &config);
    println!(
        "{}  ◆ Jobs:{} {}",
        colors::CYAN,
        colors::RESET,
        config.jobs
    );
    println!("{}", "─".repeat(50));

    let ctx = BuildContext::start(config, mode)?;

    if ctx.units().is_empty() {
        println!("\n{}No units found.{}", colors::YELLOW, colors::RESET);
        println!("Units are crates matched by the `crates` patterns in cinder.toml");
        return Ok(());
    }

    print_report(ctx.report());
    if let Some(emitted) = ctx.emitted() {
        print_emitted(emitted);
    }

    let failed = ctx.report().failed().count()
        + ctx.emitted().map_or(0, |e| e.failures().count());

    println!("\n{}", "─".repeat(50));
    if failed > 0 {
        println!(
            "{}Failed{} {} of {} units in {:.2}s",
            colors::RED,
            colors::RESET,
            ctx.report().failed().count(),
            ctx.units().len(),
            start.elapsed().as_secs_f64()
        );
        anyhow::bail!("Build failed");
    }

    println!(
        "{}Completed{} {} units in {:.2}s",
        colors::GREEN,
        colors::RESET,
        ctx.units().len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

fn print_report(report: &BuildReport) {
    println!("\n{}Units:{}", colors::BOLD, colors::RESET);
    for unit in &report.units {
        match unit.failure() {
            None if unit.skipped_fresh => println!(
                "  {}✓{} {} {}(up to date){}",
                colors::GREEN,
                colors::RESET,
                unit.name,
                colors::DIM,
                colors::RESET
            ),
            None => match &unit.rebuild_reason {
                Some(reason) => println!(
                    "  {}✓{} {} {}({}){}",
                    colors::GREEN,
                    colors::RESET,
                    unit.name,
                    colors::DIM,
                    reason,
                    colors::RESET
                ),
                None => println!("  {}✓{} {}", colors::GREEN, colors::RESET, unit.name),
            },
            Some(stage) => println!(
                "  {}✗{} {} {}({} failed){}",
                colors::RED,
                colors::RESET,
                unit.name,
                colors::DIM,
                stage.stage,
                colors::RESET
            ),
        }
    }
}

fn print_emitted(emitted: &EmitReport) {
    println!(
        "\n{}Assets:{} {} file(s)",
        colors::BOLD,
        colors::RESET,
        emitted.total_files()
    );
    for unit in emitted.failures() {
        if let Some(err) = &unit.error {
            println!("  {}✗{} {}", colors::RED, colors::RESET, err);
        }
    }
}
