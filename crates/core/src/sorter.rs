use crate::audit::AppendLog;
use crate::config::{LogPaths, SortConfig};
use crate::media_kind::MediaKind;
use crate::planner::{plan_target, target_dir};
use crate::resolver::DateResolver;
use crate::transfer::{transfer, Outcome};
use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total_seen: usize,
    pub transferred: usize,
    pub unsupported_count: usize,
    pub transfer_errors: usize,
}

impl RunStats {
    /// Every file seen ended up in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.total_seen == self.transferred + self.unsupported_count + self.transfer_errors
    }
}

/// Walks the source tree and places every supported file under its dated folder.
///
/// Files are handled one at a time. A failing file is written to the audit trail
/// and counted; it never stops the walk.
pub struct Sorter {
    config: SortConfig,
    resolver: DateResolver,
    audit: AppendLog,
    transfer_log: Option<AppendLog>,
    stats: RunStats,
}

pub fn run(config: SortConfig) -> Result<RunStats> {
    Sorter::new(config).run()
}

impl Sorter {
    pub fn new(config: SortConfig) -> Self {
        Self::with_log_paths(config, LogPaths::default())
    }

    pub fn with_log_paths(config: SortConfig, paths: LogPaths) -> Self {
        let transfer_log = config
            .logging_enabled
            .then(|| AppendLog::new(paths.transfer_log));
        Self {
            config,
            resolver: DateResolver::new(),
            audit: AppendLog::new(paths.audit),
            transfer_log,
            stats: RunStats::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: DateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn audit_log(&self) -> &AppendLog {
        &self.audit
    }

    /// Runs the whole walk. Only an invalid configuration makes this return `Err`,
    /// and in that case nothing has been touched.
    pub fn run(mut self) -> Result<RunStats> {
        self.config.validate()?;

        let source_root = self.config.source_root.clone();
        info!(
            "仕分け開始: {} -> {} ({:?}, {:?})",
            source_root.display(),
            self.config.dest_root.display(),
            self.config.transfer_mode,
            self.config.month_naming
        );
        self.audit
            .record(&format!("--- Start: {} ---", source_root.display()));

        for entry in WalkDir::new(&source_root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(source_root.as_path()).to_path_buf();
                    warn!("走査できませんでした: {}: {err}", path.display());
                    self.audit
                        .record(&format!("Error reading {}: {err}", path.display()));
                    continue;
                }
            };
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!("シンボリックリンクは対象外です: {}", entry.path().display());
                self.audit.record(&format!(
                    "Skipped symbolic link: {}",
                    entry.path().display()
                ));
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            self.process_file(entry.path());
        }

        self.audit
            .record(&format!("--- End: {} ---", source_root.display()));
        self.audit.record(&format!(
            "--- Number of not supported Files: {} ---",
            self.stats.unsupported_count
        ));
        info!(
            "仕分け完了: 対象={} 転送={} 未対応={} 失敗={}",
            self.stats.total_seen,
            self.stats.transferred,
            self.stats.unsupported_count,
            self.stats.transfer_errors
        );
        Ok(self.stats)
    }

    fn process_file(&mut self, path: &Path) {
        self.stats.total_seen += 1;

        let kind = MediaKind::from_path(path);
        if !kind.is_supported() {
            self.stats.unsupported_count += 1;
            self.audit
                .record(&format!("Skipped unsupported file: {}", path.display()));
            return;
        }

        let (date, source) = self.resolver.resolve_with_source(path, kind);
        debug!("{}: {:?} ({:?})", path.display(), date, source);

        let dest_root = self.config.dest_root.as_path();
        let naming = self.config.month_naming;
        let Some(file_name) = path.file_name() else {
            let dir = target_dir(dest_root, date, naming);
            self.record_failure(path, &dir, "ファイル名を取得できませんでした");
            return;
        };

        let target = match plan_target(dest_root, date, naming, file_name) {
            Ok(target) => target,
            Err(err) => {
                let intended = target_dir(dest_root, date, naming).join(file_name);
                self.record_failure(path, &intended, &format!("{err:#}"));
                return;
            }
        };

        let mode = self.config.transfer_mode;
        match transfer(path, &target, mode) {
            Outcome::Success => {
                self.stats.transferred += 1;
                if let Some(log) = &self.transfer_log {
                    log.record(&format!(
                        "{} {} -> {}",
                        mode.past_tense(),
                        path.display(),
                        target.display()
                    ));
                }
            }
            Outcome::Failed(reason) => self.record_failure(path, &target, &reason),
        }
    }

    fn record_failure(&mut self, src: &Path, dst: &Path, reason: &str) {
        self.stats.transfer_errors += 1;
        let line = format!(
            "Error {} {} to {}: {reason}",
            self.config.transfer_mode.gerund(),
            src.display(),
            dst.display()
        );
        warn!("{line}");
        self.audit.record(&line);
    }
}
