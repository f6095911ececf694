use crate::resolver::ResolvedDate;
use anyhow::{Context, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonthNaming {
    #[default]
    Numeric,
    LocalizedName,
}

/// Month folder names for [`MonthNaming::LocalizedName`], index = month - 1.
pub static MONTH_NAMES: [&str; 12] = [
    "01_Januar",
    "02_Februar",
    "03_Maerz",
    "04_April",
    "05_Mai",
    "06_Juni",
    "07_Juli",
    "08_August",
    "09_September",
    "10_Oktober",
    "11_November",
    "12_Dezember",
];

pub const UNKNOWN_SEGMENT: &str = "unknown";

pub fn year_segment(date: ResolvedDate) -> String {
    match date.date() {
        Some(d) => d.year().to_string(),
        None => UNKNOWN_SEGMENT.to_string(),
    }
}

pub fn month_segment(date: ResolvedDate, naming: MonthNaming) -> String {
    let Some(d) = date.date() else {
        return UNKNOWN_SEGMENT.to_string();
    };
    match naming {
        MonthNaming::Numeric => format!("{:02}", d.month()),
        MonthNaming::LocalizedName => MONTH_NAMES[d.month0() as usize].to_string(),
    }
}

pub fn day_segment(date: ResolvedDate) -> String {
    match date.date() {
        Some(d) => format!("{:02}", d.day()),
        None => UNKNOWN_SEGMENT.to_string(),
    }
}

/// `dest_root/year/month/day` without touching the filesystem.
pub fn target_dir(dest_root: &Path, date: ResolvedDate, naming: MonthNaming) -> PathBuf {
    dest_root
        .join(year_segment(date))
        .join(month_segment(date, naming))
        .join(day_segment(date))
}

/// Creates the dated folder and returns a path inside it that is not occupied yet.
pub fn plan_target(
    dest_root: &Path,
    date: ResolvedDate,
    naming: MonthNaming,
    file_name: &OsStr,
) -> Result<PathBuf> {
    let dir = target_dir(dest_root, date, naming);
    fs::create_dir_all(&dir)
        .with_context(|| format!("保存先フォルダを作成できませんでした: {}", dir.display()))?;
    Ok(resolve_collision(&dir, file_name))
}

/// Probes `name`, `stem_1.ext`, `stem_2.ext`, ... against the live filesystem.
pub fn resolve_collision(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !is_occupied(&candidate) {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let extension = as_path.extension();

    let mut n = 1u64;
    loop {
        let candidate = dir.join(suffixed_name(stem, extension, n));
        if !is_occupied(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn suffixed_name(stem: &OsStr, extension: Option<&OsStr>, n: u64) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!("_{n}"));
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

// Dangling symlinks count as occupied. Other stat errors count as free; the
// transfer opens its target with `create_new`, so nothing gets clobbered.
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
