use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use crate::config::EngineConfig;

use super::process::{EngineProcess, SpawnError};
use super::Engine;

/// Behave adapter. The configured command must select behave's `json`
/// formatter; the report location is passed with `--outfile`.
pub struct BehaveEngine {
    program: String,
    args: Vec<String>,
    workspace: PathBuf,
}

impl BehaveEngine {
    pub fn new(argv: Vec<String>, workspace: PathBuf) -> Self {
        let mut argv = argv.into_iter();
        let program = argv.next().unwrap_or_else(|| "behave".into());
        Self {
            program,
            args: argv.collect(),
            workspace,
        }
    }

    pub fn from_config(config: &EngineConfig, workspace: PathBuf) -> Result<Self> {
        Ok(Self::new(config.argv()?, workspace))
    }

    fn command(&self, report_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--outfile")
            .arg(report_path)
            .current_dir(&self.workspace);
        cmd
    }
}

#[async_trait]
impl Engine for BehaveEngine {
    async fn start(&self, report_path: &Path) -> Result<EngineProcess, SpawnError> {
        let cmd = self.command(report_path);
        tracing::debug!(cmd = ?cmd.as_std(), cwd = %self.workspace.display(), "starting engine");
        EngineProcess::spawn(cmd, &self.program)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_outfile_after_configured_args() {
        let engine = BehaveEngine::new(
            vec!["behave".into(), "--format".into(), "json".into()],
            PathBuf::from("/work"),
        );
        let cmd = engine.command(Path::new("tests/reports/results.json"));
        let std = cmd.as_std();

        assert_eq!(std.get_program(), "behave");
        let args: Vec<_> = std.get_args().collect();
        assert_eq!(
            args,
            ["--format", "json", "--outfile", "tests/reports/results.json"]
        );
        assert_eq!(std.get_current_dir(), Some(Path::new("/work")));
        assert_eq!(engine.name(), "behave");
    }
}
