use serde::Serialize;

use crate::models::{RunSummary, ScenarioStatus, StepStatus};

/// Events streamed to observers, one JSON object per line:
/// `{"event": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum Event {
    /// Acknowledgement or rejection of an observer request.
    Status {
        msg: String,
    },
    /// One raw line of engine output.
    Log {
        line: String,
    },
    Scenario {
        feature: String,
        scenario: String,
        status: ScenarioStatus,
    },
    Step {
        feature: String,
        scenario: String,
        step: String,
        status: StepStatus,
        duration: String,
    },
    /// Full snapshot, never a delta.
    Summary(RunSummary),
    /// Terminal event; exactly one per run.
    Done {
        msg: String,
    },
    Features {
        files: Vec<String>,
    },
}

impl Event {
    pub fn status(msg: impl Into<String>) -> Self {
        Event::Status { msg: msg.into() }
    }

    pub fn log(line: impl Into<String>) -> Self {
        Event::Log { line: line.into() }
    }

    pub fn done(msg: impl Into<String>) -> Self {
        Event::Done { msg: msg.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Status { .. } => "status",
            Event::Log { .. } => "log",
            Event::Scenario { .. } => "scenario",
            Event::Step { .. } => "step",
            Event::Summary(_) => "summary",
            Event::Done { .. } => "done",
            Event::Features { .. } => "features",
        }
    }

    /// Encode as a single NDJSON line, newline included.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
