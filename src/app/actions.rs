use serde::Deserialize;

use crate::{
    app::{App, Event, StartOutcome},
    emitter::{Emitter, ObserverId},
};

pub const RUN_IN_PROGRESS: &str = "A test run is already in progress";

/// Requests an observer can send, one JSON object per line.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Launch a test run; events stream back to the requesting observer.
    Start,
    /// List the feature files available in the workspace.
    Features,
}

/// Decode one inbound line. Blank lines yield `None`.
pub fn trigger_action(line: &str) -> Option<Result<Action, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line).map_err(|_| format!("Unknown command: {}", line)))
}

/// Process a request from `observer`.
pub async fn handle_action(app: &App, observer: ObserverId, action: Action) {
    let emitter = Emitter::new(app.observers.clone(), observer);
    match action {
        Action::Start => match app.start(observer) {
            StartOutcome::Started(_) => {}
            StartOutcome::Busy => emitter.emit(Event::status(RUN_IN_PROGRESS)),
        },

        Action::Features => match app.features().await {
            Ok(files) => emitter.emit(Event::Features { files }),
            Err(e) => {
                tracing::warn!(%observer, error = %e, "feature discovery failed");
                emitter.emit(Event::status(format!("Feature discovery failed: {}", e)));
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("{\"type\":\"start\"}", Action::Start)]
    #[case("  {\"type\": \"features\"}\r", Action::Features)]
    fn decodes_known_commands(#[case] line: &str, #[case] expected: Action) {
        assert_eq!(trigger_action(line), Some(Ok(expected)));
    }

    #[rstest]
    #[case("{\"type\":\"stop\"}")]
    #[case("start")]
    #[case("{\"kind\":\"start\"}")]
    fn rejects_unknown_commands(#[case] line: &str) {
        let err = trigger_action(line).unwrap().unwrap_err();
        assert_eq!(err, format!("Unknown command: {}", line));
    }

    #[test]
    fn ignores_blank_lines() {
        assert_eq!(trigger_action("   "), None);
    }
}
