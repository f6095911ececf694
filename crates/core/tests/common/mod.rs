#![allow(dead_code)]

use chrono::{Local, TimeZone};
use filetime::FileTime;
use media_sorter_core::{LogPaths, MonthNaming, SortConfig, TransferMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

pub struct Workspace {
    _temp: TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub logs: LogPaths,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&source).expect("create source");
        let logs = LogPaths {
            audit: temp.path().join("error.txt"),
            transfer_log: temp.path().join("log.txt"),
        };
        Self {
            source,
            dest,
            logs,
            _temp: temp,
        }
    }

    pub fn config(&self, mode: TransferMode, naming: MonthNaming) -> SortConfig {
        SortConfig {
            source_root: self.source.clone(),
            dest_root: self.dest.clone(),
            transfer_mode: mode,
            month_naming: naming,
            logging_enabled: true,
        }
    }

    pub fn audit_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.logs.audit)
            .expect("read audit trail")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// JPEG whose APP1 segment carries only `DateTimeOriginal`.
pub fn jpeg_with_date_time_original(value: &str) -> Vec<u8> {
    assert_eq!(value.len(), 19);
    let mut tiff = Vec::with_capacity(64);
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x8769u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&26u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x9003u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&20u32.to_le_bytes());
    tiff.extend_from_slice(&44u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(value.as_bytes());
    tiff.push(0);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&u16::try_from(8 + tiff.len()).expect("small").to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

pub fn write_file(path: &Path, body: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, body).expect("write file");
}

pub fn pin_mtime(path: &Path, year: i32, month: u32, day: u32) {
    let local = Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("unambiguous local noon");
    filetime::set_file_mtime(path, FileTime::from_unix_time(local.timestamp(), 0))
        .expect("set mtime");
}
