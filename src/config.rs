use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "stepwatch.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Where observers connect.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Example: "0.0.0.0:8000"
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".into(),
        }
    }
}

/// How the test engine is launched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shell-style command line. `--outfile <report_path>` is appended.
    /// Example: "python -m behave --format progress --format json --tags=@smoke"
    pub command: String,
    /// Location of the JSON report, relative to the workspace root.
    pub report_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "behave --format progress --format json".into(),
            report_path: PathBuf::from("tests/reports/results.json"),
        }
    }
}

impl EngineConfig {
    /// Split `command` into program and arguments.
    pub fn argv(&self) -> Result<Vec<String>> {
        let argv = shell_words::split(&self.command)
            .with_context(|| format!("invalid engine command `{}`", self.command))?;
        if argv.is_empty() {
            anyhow::bail!("engine command is empty");
        }
        Ok(argv)
    }
}

/// Controls which feature files are listed to observers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub features_dir: PathBuf,
    /// Glob patterns (relative to workspace root) of files to skip.
    /// Example: ["features/wip/**"]
    pub ignore: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            features_dir: PathBuf::from("features"),
            ignore: Vec::new(),
        }
    }
}

impl Config {
    /// Load `stepwatch.toml` from the workspace root, falling back to defaults if absent or invalid.
    pub fn load(workspace: &Path) -> Self {
        let path = workspace.join(CONFIG_FILE);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.server.addr, "127.0.0.1:8000");
        assert_eq!(
            config.engine.report_path,
            PathBuf::from("tests/reports/results.json")
        );
        assert_eq!(
            config.engine.argv().unwrap(),
            ["behave", "--format", "progress", "--format", "json"]
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[engine]\ncommand = \"python -m behave --tags '@smoke and not @slow'\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path());
        assert_eq!(
            config.engine.argv().unwrap(),
            ["python", "-m", "behave", "--tags", "@smoke and not @slow"]
        );
        assert_eq!(config.discovery.features_dir, PathBuf::from("features"));
        assert_eq!(config.server.addr, "127.0.0.1:8000");
    }

    #[test]
    fn invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "server = [").unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.server.addr, "127.0.0.1:8000");
    }

    #[test]
    fn empty_command_is_rejected() {
        let engine = EngineConfig {
            command: "  ".into(),
            ..EngineConfig::default()
        };
        assert!(engine.argv().is_err());
    }
}
