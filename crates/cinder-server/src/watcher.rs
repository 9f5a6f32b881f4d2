//! Debounced rebuild watcher.
//!
//! Watches every unit directory and rebuilds a unit after its manifest or
//! sources change. Asset edits are ignored since assets are served live.
//! While a unit is queued or rebuilding, further changes to it are coalesced
//! into a single follow-up rebuild.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinder_core::{BuildContext, CompilationUnit};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer, notify::RecursiveMode};
use rustc_hash::FxHashSet;
use tokio::sync::{Notify, mpsc};

use crate::error::{ServerError, ServerResult};

/// Directory names whose contents never trigger a rebuild.
const IGNORED_DIRS: &[&str] = &["target", "node_modules", ".git"];

/// Maps changed paths to the unit that owns them.
#[derive(Debug, Clone)]
pub struct WatchMap {
    entries: Vec<WatchEntry>,
}

#[derive(Debug, Clone)]
struct WatchEntry {
    name: String,
    root: PathBuf,
    assets: PathBuf,
}

impl WatchMap {
    pub fn new(units: &[CompilationUnit]) -> Self {
        let entries = units
            .iter()
            .map(|unit| {
                let root = unit
                    .source_path
                    .canonicalize()
                    .unwrap_or_else(|_| unit.source_path.clone());
                let assets = root.join("assets");
                WatchEntry {
                    name: unit.name.clone(),
                    root,
                    assets,
                }
            })
            .collect();
        Self { entries }
    }

    /// Unit directories to watch.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.root.as_path())
    }

    /// The unit whose rebuild `path` calls for, if any.
    ///
    /// The deepest unit root containing the path wins, so nested units are
    /// attributed correctly.
    pub fn unit_for(&self, path: &Path) -> Option<&str> {
        let entry = self
            .entries
            .iter()
            .filter(|e| path.starts_with(&e.root))
            .max_by_key(|e| e.root.components().count())?;

        if path.starts_with(&entry.assets) {
            return None;
        }

        let relative = path.strip_prefix(&entry.root).ok()?;
        let ignored = relative.components().any(|c| match c {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|n| n.starts_with('.') || IGNORED_DIRS.contains(&n)),
            _ => false,
        });

        (!ignored).then_some(entry.name.as_str())
    }
}

/// Units waiting for a rebuild, each at most once.
#[derive(Debug, Default)]
pub struct PendingSet {
    inner: Mutex<Pending>,
}

#[derive(Debug, Default)]
struct Pending {
    order: Vec<String>,
    members: FxHashSet<String>,
}

impl PendingSet {
    /// Queue `unit`. Returns `false` if it was already queued.
    pub fn mark(&self, unit: &str) -> bool {
        let mut pending = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.members.insert(unit.to_string()) {
            return false;
        }
        pending.order.push(unit.to_string());
        true
    }

    /// Take every queued unit, in the order first marked.
    pub fn drain(&self) -> Vec<String> {
        let mut pending = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        pending.members.clear();
        std::mem::take(&mut pending.order)
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .is_empty()
    }
}

/// Watches unit directories and reports changed units.
pub struct UnitWatcher {
    /// Debouncer handle (kept alive to maintain watcher).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Receiver for batches of changed unit names.
    rx: mpsc::UnboundedReceiver<Vec<String>>,
}

impl UnitWatcher {
    /// Watch the units of `ctx`, reporting after `debounce` of quiet.
    pub fn new(ctx: &BuildContext, debounce: Duration) -> ServerResult<Self> {
        let map = WatchMap::new(ctx.units());
        let roots: Vec<PathBuf> = map.roots().map(Path::to_path_buf).collect();

        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let mut changed: Vec<String> = Vec::new();
                    for event in events {
                        if let Some(unit) = map.unit_for(&event.path)
                            && !changed.iter().any(|c| c == unit)
                        {
                            changed.push(unit.to_string());
                        }
                    }
                    if !changed.is_empty() {
                        let _ = tx.send(changed);
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })
        .map_err(|e| ServerError::Watch(e.to_string()))?;

        for root in &roots {
            debouncer
                .watcher()
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| ServerError::Watch(format!("{}: {}", root.display(), e)))?;
        }

        tracing::info!("Watching {} unit(s)", roots.len());

        Ok(Self {
            _debouncer: debouncer,
            rx,
        })
    }

    /// Receive the next batch of changed units.
    pub async fn recv(&mut self) -> Option<Vec<String>> {
        self.rx.recv().await
    }

    /// Rebuild changed units until the watcher closes.
    ///
    /// A single worker drains the pending set, so at most one rebuild runs
    /// at a time and each unit is rebuilt once per burst of changes.
    pub async fn run(mut self, ctx: Arc<BuildContext>) {
        let pending = Arc::new(PendingSet::default());
        let wake = Arc::new(Notify::new());

        let worker = tokio::spawn({
            let pending = pending.clone();
            let wake = wake.clone();
            async move {
                loop {
                    wake.notified().await;
                    for name in pending.drain() {
                        rebuild(ctx.clone(), name).await;
                    }
                }
            }
        });

        while let Some(units) = self.recv().await {
            for unit in units {
                if pending.mark(&unit) {
                    tracing::debug!(unit = %unit, "Queued rebuild");
                    wake.notify_one();
                } else {
                    tracing::debug!(unit = %unit, "Rebuild already queued");
                }
            }
        }

        worker.abort();
        let _ = worker.await;
    }
}

async fn rebuild(ctx: Arc<BuildContext>, name: String) {
    tracing::info!(unit = %name, "Change detected, rebuilding");
    let task = tokio::task::spawn_blocking(move || ctx.rebuild_unit(&name).map(|r| (name, r)));

    match task.await {
        Ok(Some((name, report))) => match report.failure() {
            None => tracing::info!(unit = %name, "Rebuilt"),
            Some(stage) => tracing::error!(unit = %name, stage = %stage.stage, "Rebuild failed"),
        },
        Ok(None) => {}
        Err(e) => tracing::error!("Rebuild task panicked: {}", e),
    }
}
