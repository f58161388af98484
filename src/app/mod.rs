use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::{
    config::{Config, DiscoveryConfig},
    emitter::{Emitter, ObserverId},
    orchestrator::{Orchestrator, RunOutcome},
    runner::{self, Engine},
};

pub mod actions;
pub mod events;
pub mod observers;

pub use actions::{handle_action, trigger_action};
pub use events::Event;
pub use observers::ObserverRegistry;

pub const RUN_STARTED: &str = "Tests started";

/// Result of a `start` request.
#[derive(Debug)]
pub enum StartOutcome {
    Started(JoinHandle<RunOutcome>),
    /// Another run holds the report path; nothing was spawned.
    Busy,
}

/// Shared state behind every observer connection.
pub struct App {
    pub workspace: PathBuf,
    pub observers: Arc<ObserverRegistry>,
    orchestrator: Arc<Orchestrator>,
    discovery: DiscoveryConfig,
    /// Set while a run is in flight. Runs share one report path, so only one may be active.
    run_active: Arc<AtomicBool>,
}

impl App {
    /// The report path is anchored to the absolute workspace, since the engine
    /// resolves `--outfile` against its own working directory.
    pub fn new(workspace: PathBuf, config: &Config, engine: Arc<dyn Engine>) -> Result<Self> {
        let workspace = std::path::absolute(&workspace)
            .with_context(|| format!("failed to resolve workspace {}", workspace.display()))?;
        let report_path = workspace.join(&config.engine.report_path);
        Ok(Self {
            orchestrator: Arc::new(Orchestrator::new(engine, report_path)),
            discovery: config.discovery.clone(),
            observers: Arc::new(ObserverRegistry::new()),
            run_active: Arc::new(AtomicBool::new(false)),
            workspace,
        })
    }

    pub fn is_running(&self) -> bool {
        self.run_active.load(Ordering::Acquire)
    }

    /// Acknowledge the request and launch a run in the background for `observer`.
    ///
    /// Returns without waiting for the run; the handle resolves once the
    /// `done` event has been emitted.
    pub fn start(&self, observer: ObserverId) -> StartOutcome {
        if self
            .run_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(%observer, "start rejected, run already active");
            return StartOutcome::Busy;
        }
        let gate = RunGate(Arc::clone(&self.run_active));

        let emitter = Emitter::new(self.observers.clone(), observer);
        emitter.emit(Event::status(RUN_STARTED));

        let orchestrator = Arc::clone(&self.orchestrator);
        let observers = Arc::clone(&self.observers);
        let handle = tokio::spawn(async move {
            let _gate = gate;
            let outcome = orchestrator.run(&emitter).await;
            tracing::info!(
                %observer,
                ?outcome,
                observer_connected = observers.is_connected(&observer),
                "run finished"
            );
            outcome
        });
        StartOutcome::Started(handle)
    }

    /// Feature files under the configured directory, relative to the workspace.
    pub async fn features(&self) -> Result<Vec<String>> {
        let workspace = self.workspace.clone();
        let discovery = self.discovery.clone();
        tokio::task::spawn_blocking(move || {
            runner::discover_features(&workspace, &discovery.features_dir, &discovery.ignore)
        })
        .await
        .context("feature discovery task failed")?
    }
}

/// Releases the single-run slot when the run task ends, however it ends.
struct RunGate(Arc<AtomicBool>);

impl Drop for RunGate {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
