pub mod report;
pub mod status;
pub mod summary;

pub use report::RunReport;
pub use status::{ScenarioStatus, StepStatus, Verdict};
pub use summary::RunSummary;
