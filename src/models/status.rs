use serde::{Deserialize, Serialize};

/// Outcome of a single step as recorded in the engine report.
///
/// Anything the engine reports besides `passed`, `failed` and `skipped`
/// (behave's `undefined`, `untested`, ...) collapses into `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    #[default]
    Unknown,
}

impl From<String> for StepStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "passed" => StepStatus::Passed,
            "failed" => StepStatus::Failed,
            "skipped" => StepStatus::Skipped,
            _ => StepStatus::Unknown,
        }
    }
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed)
    }
}

/// Final result of a scenario or feature once all of its children are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    #[default]
    Passed,
    Failed,
}

impl Verdict {
    /// Fold another child result in. Once failed, always failed.
    pub fn absorb(&mut self, failed: bool) {
        if failed {
            *self = Verdict::Failed;
        }
    }
}

/// Status carried by `scenario` events: announced as running, then settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Running,
    Passed,
    Failed,
}

impl From<Verdict> for ScenarioStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Passed => ScenarioStatus::Passed,
            Verdict::Failed => ScenarioStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("\"passed\"", StepStatus::Passed)]
    #[case("\"failed\"", StepStatus::Failed)]
    #[case("\"skipped\"", StepStatus::Skipped)]
    #[case("\"undefined\"", StepStatus::Unknown)]
    #[case("\"untested\"", StepStatus::Unknown)]
    fn step_status_from_report(#[case] raw: &str, #[case] expected: StepStatus) {
        let status: StepStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status, expected);
    }

    #[test]
    fn unknown_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StepStatus::Unknown).unwrap(),
            "\"unknown\""
        );
        assert_eq!(
            serde_json::to_string(&ScenarioStatus::Running).unwrap(),
            "\"running\""
        );
    }

    #[test]
    fn verdict_never_recovers() {
        let mut verdict = Verdict::default();
        verdict.absorb(false);
        assert_eq!(verdict, Verdict::Passed);
        verdict.absorb(true);
        verdict.absorb(false);
        assert_eq!(verdict, Verdict::Failed);
        assert_eq!(ScenarioStatus::from(verdict), ScenarioStatus::Failed);
    }
}
