use anyhow::{Context, Result};
use log::warn;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only UTF-8 text file, one event per line.
///
/// The file is reopened in append mode for every line, so earlier content
/// (including content from previous runs) is never truncated.
#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("ログファイルを開けませんでした: {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("ログを書き込めませんでした: {}", self.path.display()))?;
        Ok(())
    }

    /// Like [`append`](Self::append), but a write failure is only reported through `log`.
    pub fn record(&self, line: &str) {
        if let Err(err) = self.append(line) {
            warn!("{err:#}");
        }
    }
}
