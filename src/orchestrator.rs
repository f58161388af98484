//! Drives a single test run from process launch to the terminal `done` event.
//!
//! The run moves through `Starting → Streaming → AwaitingReport → Walking → Done`.
//! Every path, including a missing engine or an unreadable report, ends in
//! exactly one `done` event for the observer.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;

use crate::app::Event;
use crate::emitter::Emitter;
use crate::models::{RunReport, RunSummary, ScenarioStatus, Verdict};
use crate::runner::{Engine, ReportOutcome, SpawnError, report};

pub const DONE_COMPLETED: &str = "All tests completed";
pub const DONE_NO_REPORT: &str = "Completed (no report).";
pub const DONE_PARSE_ERROR: &str = "Completed (parse error).";
pub const DONE_REPORT_UNAVAILABLE: &str = "Failed: could not reset report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Starting,
    Streaming,
    AwaitingReport,
    Walking,
    Done,
}

/// How a run ended, for the host's own bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A stale report could not be cleared, so the engine was never started.
    ReportUnavailable,
    EngineFailed,
    NoReport,
    ParseError,
    Completed(RunSummary),
}

pub struct Orchestrator {
    engine: Arc<dyn Engine>,
    report_path: PathBuf,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn Engine>, report_path: PathBuf) -> Self {
        Self {
            engine,
            report_path,
        }
    }

    pub async fn run(&self, emitter: &Emitter) -> RunOutcome {
        let observer = emitter.observer();
        let mut phase = Phase::Starting;
        tracing::debug!(%observer, ?phase, engine = self.engine.name(), "run phase");

        if let Err(e) = report::prepare(&self.report_path).await {
            tracing::warn!(%observer, path = %self.report_path.display(), error = %e, "could not reset report path");
            emitter.emit(Event::log(format!(
                "ERROR: could not reset report at {}: {}",
                self.report_path.display(),
                e
            )));
            emitter.emit(Event::done(DONE_REPORT_UNAVAILABLE));
            return RunOutcome::ReportUnavailable;
        }

        let mut process = match self.engine.start(&self.report_path).await {
            Ok(process) => process,
            Err(e) => {
                tracing::warn!(%observer, error = %e, "engine failed to start");
                let (line, msg) = spawn_failure_messages(&e);
                emitter.emit(Event::log(line));
                emitter.emit(Event::done(msg));
                return RunOutcome::EngineFailed;
            }
        };

        phase = Phase::Streaming;
        tracing::debug!(%observer, ?phase, "run phase");
        {
            let mut lines = process.lines();
            while let Some(line) = lines.next().await {
                emitter.emit(Event::log(line));
            }
        }

        phase = Phase::AwaitingReport;
        tracing::debug!(%observer, ?phase, "run phase");
        match process.wait().await {
            Ok(status) => tracing::debug!(%observer, code = ?status.code(), "engine exited"),
            Err(e) => tracing::warn!(%observer, error = %e, "failed to wait for engine"),
        }

        let report = match report::load(&self.report_path).await {
            ReportOutcome::Loaded(report) => report,
            ReportOutcome::NoReport => {
                emitter.emit(Event::log(format!(
                    "No JSON report found at {}.",
                    self.report_path.display()
                )));
                emitter.emit(Event::done(DONE_NO_REPORT));
                return RunOutcome::NoReport;
            }
            ReportOutcome::ParseError(e) => {
                tracing::warn!(%observer, error = %e, "report could not be decoded");
                emitter.emit(Event::log(format!("Error reading JSON report: {}", e)));
                emitter.emit(Event::done(DONE_PARSE_ERROR));
                return RunOutcome::ParseError;
            }
        };

        phase = Phase::Walking;
        tracing::debug!(%observer, ?phase, features = report.features.len(), "run phase");
        let summary = walk(&report, emitter);

        phase = Phase::Done;
        tracing::debug!(%observer, ?phase, ?summary, "run phase");
        emitter.emit(Event::done(DONE_COMPLETED));
        RunOutcome::Completed(summary)
    }
}

fn spawn_failure_messages(err: &SpawnError) -> (String, String) {
    let program = err.program();
    match err {
        SpawnError::EngineNotFound { .. } => (
            format!(
                "ERROR: {} not found. Is it installed in this environment?",
                program
            ),
            format!("Failed: {} not found", program),
        ),
        SpawnError::Io { .. } => (
            format!("ERROR: {}", err),
            format!("Failed: could not start {}", program),
        ),
    }
}

/// Replay a loaded report as scenario/step/summary events, returning the final counts.
fn walk(report: &RunReport, emitter: &Emitter) -> RunSummary {
    let mut summary = RunSummary::new();

    for feature in &report.features {
        summary.open_feature();
        let feature_name = feature.name();
        let mut feature_verdict = Verdict::Passed;

        for scenario in feature.scenarios() {
            summary.open_scenario();
            let scenario_name = scenario.name();
            emitter.emit(Event::Scenario {
                feature: feature_name.to_string(),
                scenario: scenario_name.to_string(),
                status: ScenarioStatus::Running,
            });

            let mut scenario_verdict = Verdict::Passed;
            for step in scenario.steps() {
                let status = step.status();
                summary.record_step(status);
                scenario_verdict.absorb(status.is_failed());
                feature_verdict.absorb(status.is_failed());

                emitter.emit(Event::Step {
                    feature: feature_name.to_string(),
                    scenario: scenario_name.to_string(),
                    step: step.label(),
                    status,
                    duration: step.duration_display(),
                });
                emitter.emit(Event::Summary(summary));
            }

            summary.close_scenario(scenario_verdict);
            emitter.emit(Event::Scenario {
                feature: feature_name.to_string(),
                scenario: scenario_name.to_string(),
                status: scenario_verdict.into(),
            });
        }

        summary.close_feature(feature_verdict);
        emitter.emit(Event::Summary(summary));
    }

    summary
}
