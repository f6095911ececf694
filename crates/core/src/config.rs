use crate::planner::MonthNaming;
use crate::transfer::TransferMode;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_AUDIT_FILE: &str = "error.txt";
pub const DEFAULT_TRANSFER_LOG_FILE: &str = "log.txt";

/// Everything one sorting run needs. Not changed while the run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortConfig {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub transfer_mode: TransferMode,
    pub month_naming: MonthNaming,
    pub logging_enabled: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("入力フォルダが指定されていません")]
    EmptySource,
    #[error("入力フォルダが存在しません: {0}")]
    SourceMissing(PathBuf),
    #[error("入力パスがフォルダではありません: {0}")]
    SourceNotDirectory(PathBuf),
    #[error("出力フォルダが指定されていません")]
    EmptyDestination,
    #[error("出力パスがフォルダではありません: {0}")]
    DestinationNotDirectory(PathBuf),
    #[error("出力フォルダが入力フォルダの中にあります: {0}")]
    DestinationInsideSource(PathBuf),
}

impl SortConfig {
    /// Checks the roots without creating or modifying anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptySource);
        }
        if !self.source_root.exists() {
            return Err(ConfigError::SourceMissing(self.source_root.clone()));
        }
        if !self.source_root.is_dir() {
            return Err(ConfigError::SourceNotDirectory(self.source_root.clone()));
        }
        if self.dest_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDestination);
        }
        if self.dest_root.exists() && !self.dest_root.is_dir() {
            return Err(ConfigError::DestinationNotDirectory(self.dest_root.clone()));
        }

        if let (Some(source), Some(dest)) = (
            resolve_existing_prefix(&self.source_root),
            resolve_existing_prefix(&self.dest_root),
        ) {
            if dest.starts_with(&source) {
                return Err(ConfigError::DestinationInsideSource(self.dest_root.clone()));
            }
        }
        Ok(())
    }
}

/// Canonicalizes the deepest existing ancestor and re-appends the rest, so a
/// destination that does not exist yet can still be compared with the source.
fn resolve_existing_prefix(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let mut missing = Vec::new();
    let mut cursor = absolute.as_path();
    loop {
        if let Ok(canonical) = fs::canonicalize(cursor) {
            let mut resolved = canonical;
            for part in missing.iter().rev() {
                resolved.push(part);
            }
            return Some(resolved);
        }
        match (cursor.file_name(), cursor.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name.to_os_string());
                cursor = parent;
            }
            _ => return None,
        }
    }
}

/// Where the always-on audit trail and the optional transfer log are written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogPaths {
    pub audit: PathBuf,
    pub transfer_log: PathBuf,
}

impl Default for LogPaths {
    fn default() -> Self {
        Self {
            audit: PathBuf::from(DEFAULT_AUDIT_FILE),
            transfer_log: PathBuf::from(DEFAULT_TRANSFER_LOG_FILE),
        }
    }
}

/// Persisted defaults for the command line front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub transfer_mode: TransferMode,
    pub month_naming: MonthNaming,
    pub logging_enabled: bool,
    pub audit_file: PathBuf,
    pub transfer_log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transfer_mode: TransferMode::Copy,
            month_naming: MonthNaming::Numeric,
            logging_enabled: false,
            audit_file: PathBuf::from(DEFAULT_AUDIT_FILE),
            transfer_log_file: PathBuf::from(DEFAULT_TRANSFER_LOG_FILE),
        }
    }
}

impl AppConfig {
    pub fn log_paths(&self) -> LogPaths {
        LogPaths {
            audit: self.audit_file.clone(),
            transfer_log: self.transfer_log_file.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("org", "media-sorter", "media-sorter")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("設定ファイルを読めませんでした: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let paths = app_paths()?;
    save_config_to(config, &paths.config_path)?;
    Ok(paths.config_path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| {
            format!("設定ディレクトリを作成できませんでした: {}", dir.display())
        })?;
    }
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(path, body)
        .with_context(|| format!("設定ファイルを書き込めませんでした: {}", path.display()))?;
    Ok(())
}
