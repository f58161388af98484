pub mod behave;
pub mod process;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

pub use behave::BehaveEngine;
pub use process::{EngineProcess, SpawnError};
pub use report::ReportOutcome;

/// Trait for engine adapters that can be launched for a single run.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Launch the engine, asking it to write its JSON report to `report_path`.
    async fn start(&self, report_path: &Path) -> Result<EngineProcess, SpawnError>;

    /// Display name for this engine (e.g., "behave").
    fn name(&self) -> &str;
}

/// Find `*.feature` files under `features_dir`, relative to `workspace` and sorted.
pub fn discover_features(
    workspace: &Path,
    features_dir: &Path,
    ignore: &[String],
) -> Result<Vec<String>> {
    let ignore = ignore
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("invalid ignore pattern `{}`", p)))
        .collect::<Result<Vec<_>>>()?;

    let pattern = workspace
        .join(features_dir)
        .join("**/")
        .join("*.feature")
        .to_string_lossy()
        .to_string();

    let mut files: Vec<String> = Vec::new();
    for entry in glob::glob(&pattern)?.flatten() {
        let relative: PathBuf = entry
            .strip_prefix(workspace)
            .unwrap_or(&entry)
            .to_path_buf();
        if ignore.iter().any(|p| p.matches_path(&relative)) {
            continue;
        }
        let display = relative.to_string_lossy().to_string();
        if !files.contains(&display) {
            files.push(display);
        }
    }
    files.sort();

    Ok(files)
}
