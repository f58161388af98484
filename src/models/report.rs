use serde::Deserialize;

use super::status::StepStatus;

const UNNAMED_FEATURE: &str = "Unnamed Feature";
const UNNAMED_SCENARIO: &str = "Unnamed Scenario";

/// A behave JSON report: the top level is a bare array of features.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RunReport {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub elements: Option<Vec<Element>>,
}

impl Feature {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_FEATURE)
    }

    /// Scenario elements in report order. Backgrounds and other kinds are skipped.
    pub fn scenarios(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|e| e.is_scenario())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Element {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<Step>>,
}

impl Element {
    pub fn is_scenario(&self) -> bool {
        self.kind.as_deref() == Some("scenario")
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_SCENARIO)
    }

    pub fn steps(&self) -> &[Step] {
        self.steps.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub result: Option<StepResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepResult {
    #[serde(default)]
    pub status: Option<StepStatus>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Step {
    /// `"<keyword> <name>"`, trimmed.
    pub fn label(&self) -> String {
        let keyword = self.keyword.as_deref().unwrap_or_default();
        let name = self.name.as_deref().unwrap_or_default();
        format!("{} {}", keyword, name).trim().to_string()
    }

    pub fn status(&self) -> StepStatus {
        self.result
            .as_ref()
            .and_then(|r| r.status)
            .unwrap_or_default()
    }

    pub fn duration(&self) -> f64 {
        self.result.as_ref().and_then(|r| r.duration).unwrap_or(0.0)
    }

    /// Duration as shown to observers, e.g. `0.25s`.
    pub fn duration_display(&self) -> String {
        format!("{:.2}s", self.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"[
      {
        "keyword": "Feature",
        "name": "Calculator",
        "elements": [
          {
            "type": "background",
            "name": "",
            "steps": [{"keyword": "Given", "name": "a clean slate"}]
          },
          {
            "type": "scenario",
            "name": "Add two numbers",
            "steps": [
              {"keyword": "Given ", "name": "I have numbers 2 and 3", "result": {"status": "passed", "duration": 0.0012}},
              {"keyword": "When", "name": "I add them", "result": {"status": "failed"}},
              {"keyword": "Then", "name": "the result should be 5", "result": {"status": "skipped", "duration": null}}
            ]
          }
        ]
      },
      {"elements": null}
    ]"#;

    #[test]
    fn parses_behave_report_and_skips_backgrounds() {
        let report: RunReport = serde_json::from_str(REPORT).unwrap();
        assert_eq!(report.features.len(), 2);

        let calc = &report.features[0];
        assert_eq!(calc.name(), "Calculator");
        let scenarios: Vec<_> = calc.scenarios().collect();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name(), "Add two numbers");

        let steps = scenarios[0].steps();
        assert_eq!(steps[0].label(), "Given  I have numbers 2 and 3");
        assert_eq!(steps[0].status(), StepStatus::Passed);
        assert_eq!(steps[0].duration_display(), "0.00s");
        assert_eq!(steps[1].status(), StepStatus::Failed);
        assert_eq!(steps[2].status(), StepStatus::Skipped);
        assert_eq!(steps[2].duration(), 0.0);

        let empty = &report.features[1];
        assert_eq!(empty.name(), "Unnamed Feature");
        assert_eq!(empty.scenarios().count(), 0);
    }

    #[test]
    fn step_without_result_is_unknown() {
        let step: Step = serde_json::from_str(r#"{"keyword": "Then"}"#).unwrap();
        assert_eq!(step.label(), "Then");
        assert_eq!(step.status(), StepStatus::Unknown);
        assert_eq!(step.duration_display(), "0.00s");

        let step: Step = serde_json::from_str(r#"{"name": "x", "result": null}"#).unwrap();
        assert_eq!(step.status(), StepStatus::Unknown);
    }

    #[test]
    fn duration_is_rounded_to_hundredths() {
        let step: Step =
            serde_json::from_str(r#"{"result": {"status": "passed", "duration": 12.3456}}"#).unwrap();
        assert_eq!(step.duration_display(), "12.35s");
    }
}
