//! Serve command implementation for Cinder CLI.
//!
//! Builds all units in development mode, then starts the dev server.

use std::path::Path;
use std::sync::Arc;

use cinder_core::{BuildContext, Mode};
use cinder_server::ServerConfig;

use crate::{colors, project};

/// Build and serve.
pub async fn execute(root: &Path, host: &str, port: u16, jobs: Option<usize>) -> anyhow::Result<()> {
    let config = project::load(root, jobs)?;
    project::print_header("Development Server", &config);

    let ctx = tokio::task::spawn_blocking(move || BuildContext::start(config, Mode::Development))
        .await??;

    let failed = ctx.report().failed().count();
    println!(
        "{}  ◆ Units:{} {} ({} failed)",
        colors::CYAN,
        colors::RESET,
        ctx.units().len(),
        failed
    );

    let server = ServerConfig {
        host: host.to_string(),
        port,
    };

    println!(
        "{}  ◆ Server:{} http://{}:{}{}",
        colors::CYAN,
        colors::RESET,
        server.host,
        server.port,
        ctx.config().url_prefix()
    );
    if let Some(ms) = ctx.config().watch_debounce_ms {
        println!(
            "{}  ◆ Watching:{} rebuild after {}ms of quiet",
            colors::CYAN,
            colors::RESET,
            ms
        );
    }
    println!("{}", "─".repeat(50));
    println!("{}Press Ctrl+C to stop{}", colors::GREEN, colors::RESET);
    println!();

    cinder_server::serve(Arc::new(ctx), server).await?;

    Ok(())
}
