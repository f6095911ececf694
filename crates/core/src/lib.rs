mod audit;
mod config;
mod exif_reader;
mod file_count;
mod heic;
mod media_kind;
mod planner;
mod resolver;
mod sorter;
mod transfer;

pub use audit::AppendLog;
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    ConfigError, LogPaths, SortConfig, DEFAULT_AUDIT_FILE, DEFAULT_TRANSFER_LOG_FILE,
};
pub use exif_reader::{parse_exif_datetime, read_date_time_original, EXIF_DATETIME_FORMAT};
pub use file_count::count_files;
pub use media_kind::{MediaKind, SUPPORTED_EXTENSIONS};
pub use planner::{
    day_segment, month_segment, plan_target, resolve_collision, target_dir, year_segment,
    MonthNaming, MONTH_NAMES, UNKNOWN_SEGMENT,
};
pub use resolver::{DateResolver, DateSource, ResolvedDate};
pub use sorter::{run, RunStats, Sorter};
pub use transfer::{transfer, Outcome, TransferMode};

pub fn heic_supported() -> bool {
    heic::is_available()
}
