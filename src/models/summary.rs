use serde::{Deserialize, Serialize};

use super::status::{StepStatus, Verdict};

/// Pass/fail counts for features or scenarios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Tally {
    fn settle(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Passed => self.passed += 1,
            Verdict::Failed => self.failed += 1,
        }
    }
}

/// Step counts. `unknown` steps only move `total`, so
/// `passed + failed + skipped` may trail it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Running counts for one test run. Counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub features: Tally,
    pub scenarios: Tally,
    pub steps: StepTally,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_feature(&mut self) {
        self.features.total += 1;
    }

    pub fn open_scenario(&mut self) {
        self.scenarios.total += 1;
    }

    pub fn record_step(&mut self, status: StepStatus) {
        self.steps.total += 1;
        match status {
            StepStatus::Passed => self.steps.passed += 1,
            StepStatus::Failed => self.steps.failed += 1,
            StepStatus::Skipped => self.steps.skipped += 1,
            StepStatus::Unknown => {}
        }
    }

    pub fn close_scenario(&mut self, verdict: Verdict) {
        self.scenarios.settle(verdict);
    }

    pub fn close_feature(&mut self, verdict: Verdict) {
        self.features.settle(verdict);
    }

    /// True when no counter in `self` is below its value in `earlier`.
    #[cfg(test)]
    pub fn dominates(&self, earlier: &RunSummary) -> bool {
        let tally = |a: &Tally, b: &Tally| {
            a.total >= b.total && a.passed >= b.passed && a.failed >= b.failed
        };
        tally(&self.features, &earlier.features)
            && tally(&self.scenarios, &earlier.scenarios)
            && self.steps.total >= earlier.steps.total
            && self.steps.passed >= earlier.steps.passed
            && self.steps.failed >= earlier.steps.failed
            && self.steps.skipped >= earlier.steps.skipped
    }
}
