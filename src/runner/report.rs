use std::io;
use std::path::Path;

use crate::models::RunReport;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{0}")]
    Read(#[from] io::Error),
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

/// What the engine left behind once it exited.
#[derive(Debug)]
pub enum ReportOutcome {
    /// No file, or an empty one.
    NoReport,
    ParseError(ReportError),
    Loaded(RunReport),
}

/// Make sure the report directory exists and no stale report is lying around.
pub async fn prepare(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Read and decode the report at `path`. Call only after the engine has exited.
pub async fn load(path: &Path) -> ReportOutcome {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        Ok(_) => return ReportOutcome::NoReport,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return ReportOutcome::NoReport,
        Err(e) => return ReportOutcome::ParseError(e.into()),
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => return ReportOutcome::ParseError(e.into()),
    };

    match serde_json::from_slice::<RunReport>(&bytes) {
        Ok(report) => ReportOutcome::Loaded(report),
        Err(e) => ReportOutcome::ParseError(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn missing_file_is_no_report(dir: TempDir) {
        let outcome = load(&dir.path().join("results.json")).await;
        assert!(matches!(outcome, ReportOutcome::NoReport));
    }

    #[rstest]
    #[tokio::test]
    async fn empty_file_is_no_report(dir: TempDir) {
        let path = dir.path().join("results.json");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(load(&path).await, ReportOutcome::NoReport));
    }

    #[rstest]
    #[case::truncated("[{\"name\": \"Calc")]
    #[case::wrong_shape("{\"features\": []}")]
    #[case::binary("\u{0}\u{1}garbage")]
    #[tokio::test]
    async fn undecodable_file_is_parse_error(dir: TempDir, #[case] content: &str) {
        let path = dir.path().join("results.json");
        std::fs::write(&path, content).unwrap();
        match load(&path).await {
            ReportOutcome::ParseError(ReportError::Decode(e)) => {
                assert!(!e.to_string().is_empty());
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn valid_file_is_loaded(dir: TempDir) {
        let path = dir.path().join("results.json");
        std::fs::write(&path, r#"[{"name": "Calc", "elements": []}]"#).unwrap();
        match load(&path).await {
            ReportOutcome::Loaded(report) => assert_eq!(report.features[0].name(), "Calc"),
            other => panic!("expected report, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn prepare_creates_directory_and_removes_stale_report(dir: TempDir) {
        let path = dir.path().join("tests/reports/results.json");
        prepare(&path).await.unwrap();
        assert!(path.parent().unwrap().is_dir());

        std::fs::write(&path, "[]").unwrap();
        prepare(&path).await.unwrap();
        assert!(!path.exists());
    }
}
