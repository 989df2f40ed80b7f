//! File persistence for finalized rule sets

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use lm_compiler::{FinalizedSet, OutputError, ProcessingStats, RuleSetSink};

pub const STATS_FILE: &str = "stats.json";

/// Writes each set to `<dir>/<stem>.txt`, overwriting.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, set: &FinalizedSet) -> PathBuf {
        self.dir.join(format!("{}.txt", set.kind.file_stem()))
    }
}

#[async_trait]
impl RuleSetSink for FileSink {
    async fn write(&self, set: &FinalizedSet) -> Result<(), OutputError> {
        let path = self.path_for(set);
        write_file(&path, set.render().as_bytes()).await?;
        log::info!("Wrote {} rules to {}", set.lines.len(), path.display());
        Ok(())
    }
}

pub async fn write_stats(dir: &Path, stats: &ProcessingStats) -> Result<PathBuf, OutputError> {
    let json = serde_json::to_string_pretty(stats).map_err(|e| OutputError::Serialize(e.to_string()))?;
    let path = dir.join(STATS_FILE);
    write_file(&path, json.as_bytes()).await?;
    Ok(path)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(io_err)
}

#[cfg(test)]
mod tests {
    use lm_core::types::RuleSetKind;

    use super::*;

    fn hosts_set(lines: &[&str]) -> FinalizedSet {
        FinalizedSet {
            kind: RuleSetKind::Hosts,
            header: "# Title: test\n#\n".to_string(),
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("lists");
        let sink = FileSink::new(&nested);

        sink.write(&hosts_set(&["0.0.0.0 a.com", "0.0.0.0 b.com"])).await.unwrap();
        sink.write(&hosts_set(&["0.0.0.0 c.com"])).await.unwrap();

        let written = std::fs::read_to_string(nested.join("hosts.txt")).unwrap();
        assert_eq!(written, "# Title: test\n#\n0.0.0.0 c.com\n");
    }

    #[tokio::test]
    async fn writes_stats_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut stats = ProcessingStats::default();
        stats.invalid = 7;

        let path = write_stats(dir.path(), &stats).await.unwrap();
        let parsed: ProcessingStats = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.invalid, 7);
    }
}
