use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info, LevelFilter};
use media_sorter_core::{
    app_paths, count_files, heic_supported, load_config, save_config, AppConfig, AppendLog,
    DateResolver, LogPaths, MonthNaming, RunStats, SortConfig, Sorter, TransferMode,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-sorter-cli")]
#[command(about = "写真と動画を撮影日ごとのフォルダ (年/月/日) に仕分けします")]
struct Cli {
    /// -v で info、-vv で debug、-vvv で trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Sort(SortArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Init {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct SortArgs {
    #[arg(long)]
    source: PathBuf,
    #[arg(long)]
    dest: PathBuf,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    #[arg(long, value_enum)]
    months: Option<MonthsArg>,
    /// 転送ログ (log.txt) を書き出す
    #[arg(long, default_value_t = false, conflicts_with = "no_log")]
    log: bool,
    /// 設定で有効になっていても転送ログを書き出さない
    #[arg(long, default_value_t = false)]
    no_log: bool,
    #[arg(long)]
    audit_file: Option<PathBuf>,
    #[arg(long)]
    transfer_log: Option<PathBuf>,
    /// EXIF/HEICを読まず、更新日時だけで仕分ける
    #[arg(long, default_value_t = false)]
    mtime_only: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

impl SortArgs {
    fn logging_enabled(&self, default: bool) -> bool {
        match (self.log, self.no_log) {
            (true, _) => true,
            (_, true) => false,
            _ => default,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Copy,
    Move,
}

impl From<ModeArg> for TransferMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Copy => TransferMode::Copy,
            ModeArg::Move => TransferMode::Move,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MonthsArg {
    Numeric,
    Names,
}

impl From<MonthsArg> for MonthNaming {
    fn from(value: MonthsArg) -> Self {
        match value {
            MonthsArg::Numeric => MonthNaming::Numeric,
            MonthsArg::Names => MonthNaming::LocalizedName,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct SortReport {
    stats: RunStats,
    source_files: usize,
    dest_files: usize,
    expected_unsupported: i64,
    successful: bool,
}

impl SortReport {
    fn new(stats: RunStats, source_files: usize, dest_files: usize) -> Self {
        let expected_unsupported = source_files as i64 - dest_files as i64;
        let successful = stats.unsupported_count as i64 == expected_unsupported
            && stats.transfer_errors == 0;
        Self {
            stats,
            source_files,
            dest_files,
            expected_unsupported,
            successful,
        }
    }

    fn audit_lines(&self) -> Vec<String> {
        let verdict = if self.successful {
            "--- Operation successful: all files moved/copied. ---"
        } else {
            "--- Operation finished with errors. Please review the log. ---"
        };
        vec![
            format!(
                "--- Number of files in source directory: {} ---",
                self.source_files
            ),
            format!(
                "--- Number of files in destination directory: {} ---",
                self.dest_files
            ),
            format!(
                "--- Number of not supported files should be: {} ---",
                self.expected_unsupported
            ),
            verdict.to_string(),
            "--- End of sorting ---".to_string(),
        ]
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Sort(args) => cmd_sort(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init { force } => cmd_config_init(force),
        },
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn cmd_sort(args: SortArgs) -> Result<()> {
    let defaults = load_config()?;
    let logging_enabled = args.logging_enabled(defaults.logging_enabled);
    let config = SortConfig {
        source_root: args.source,
        dest_root: args.dest,
        transfer_mode: args.mode.map_or(defaults.transfer_mode, Into::into),
        month_naming: args.months.map_or(defaults.month_naming, Into::into),
        logging_enabled,
    };
    let log_paths = LogPaths {
        audit: args.audit_file.unwrap_or(defaults.audit_file),
        transfer_log: args.transfer_log.unwrap_or(defaults.transfer_log_file),
    };
    config.validate()?;
    debug!("HEIC対応: {}", heic_supported());

    let source_files = count_files(&config.source_root);
    info!("入力フォルダのファイル数: {source_files}");

    let resolver = if args.mtime_only {
        DateResolver::without_embedded_metadata()
    } else {
        DateResolver::new()
    };
    let dest_root = config.dest_root.clone();
    let sorter = Sorter::with_log_paths(config, log_paths).with_resolver(resolver);
    let audit = AppendLog::new(sorter.audit_log().path());
    let stats = sorter.run()?;

    let dest_files = count_files(&dest_root);
    let report = SortReport::new(stats, source_files, dest_files);
    for line in report.audit_lines() {
        audit.record(&line);
    }

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print_table(&report),
    }

    if report.successful {
        eprintln!("仕分け完了: 全ファイルを処理しました。");
    } else {
        eprintln!(
            "仕分け終了 (エラーあり): {} を確認してください。",
            audit.path().display()
        );
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() && !force {
        anyhow::bail!(
            "設定ファイルは既に存在します: {} (上書きするには --force を指定してください)",
            paths.config_path.display()
        );
    }
    let written = save_config(&AppConfig::default())
        .with_context(|| format!("設定を初期化できませんでした: {}", paths.config_dir.display()))?;
    println!("設定ファイルを作成しました: {}", written.display());
    Ok(())
}

fn print_table(report: &SortReport) {
    let stats = &report.stats;
    println!(
        "集計: seen={} transferred={} unsupported={} errors={}",
        stats.total_seen, stats.transferred, stats.unsupported_count, stats.transfer_errors
    );
    println!(
        "ファイル数: source={} dest={} (未対応の想定 {})",
        report.source_files, report.dest_files, report.expected_unsupported
    );
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, SortArgs, SortReport};
    use clap::Parser;
    use media_sorter_core::RunStats;

    fn parse_sort(extra: &[&str]) -> Result<SortArgs, clap::Error> {
        let mut argv = vec!["media-sorter-cli", "sort", "--source", "in", "--dest", "out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv)?.command {
            Commands::Sort(args) => Ok(args),
            Commands::Config(_) => panic!("expected the sort subcommand"),
        }
    }

    #[test]
    fn log_flags_override_the_persisted_default() {
        let plain = parse_sort(&[]).expect("parse");
        assert!(plain.logging_enabled(true));
        assert!(!plain.logging_enabled(false));

        let on = parse_sort(&["--log"]).expect("parse --log");
        assert!(on.logging_enabled(false));

        let off = parse_sort(&["--no-log"]).expect("parse --no-log");
        assert!(!off.logging_enabled(true));

        assert!(parse_sort(&["--log", "--no-log"]).is_err());
    }

    fn stats(unsupported_count: usize, transfer_errors: usize) -> RunStats {
        RunStats {
            total_seen: 5,
            transferred: 5 - unsupported_count - transfer_errors,
            unsupported_count,
            transfer_errors,
        }
    }

    #[test]
    fn balanced_move_is_reported_successful() {
        let report = SortReport::new(stats(2, 0), 5, 3);
        assert!(report.successful);
        let lines = report.audit_lines();
        assert_eq!(lines[2], "--- Number of not supported files should be: 2 ---");
        assert_eq!(lines[3], "--- Operation successful: all files moved/copied. ---");
        assert_eq!(lines[4], "--- End of sorting ---");
    }

    #[test]
    fn transfer_errors_fail_the_reconciliation() {
        let report = SortReport::new(stats(2, 1), 5, 3);
        assert!(!report.successful);
        assert_eq!(
            report.audit_lines()[3],
            "--- Operation finished with errors. Please review the log. ---"
        );
    }

    #[test]
    fn destination_larger_than_source_goes_negative() {
        let report = SortReport::new(stats(0, 0), 2, 5);
        assert_eq!(report.expected_unsupported, -3);
        assert!(!report.successful);
    }
}
