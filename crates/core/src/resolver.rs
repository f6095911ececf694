use crate::exif_reader::read_date_time_original;
use crate::heic;
use crate::media_kind::MediaKind;
use chrono::{DateTime, Local, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResolvedDate {
    Known(NaiveDate),
    Unknown,
}

impl ResolvedDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(ResolvedDate::Known)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ResolvedDate::Known(date) => Some(*date),
            ResolvedDate::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ResolvedDate::Known(_))
    }
}

/// Which step of the lookup chain produced a date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateSource {
    Exif,
    Heic,
    FileModified,
    None,
}

/// Picks the capture date of a media file.
///
/// Embedded metadata is tried first for images; whenever it yields nothing the
/// file's modification time is used, and if that cannot be read either the date
/// is [`ResolvedDate::Unknown`]. Nothing is cached between calls.
#[derive(Debug, Clone, Copy)]
pub struct DateResolver {
    embedded_metadata: bool,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self {
            embedded_metadata: true,
        }
    }
}

impl DateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that goes straight to the modification time.
    pub fn without_embedded_metadata() -> Self {
        Self {
            embedded_metadata: false,
        }
    }

    pub fn resolve(&self, path: &Path, kind: MediaKind) -> ResolvedDate {
        self.resolve_with_source(path, kind).0
    }

    pub fn resolve_with_source(&self, path: &Path, kind: MediaKind) -> (ResolvedDate, DateSource) {
        if let Some((date, source)) = self.embedded_date(path, kind) {
            return (ResolvedDate::Known(date), source);
        }

        match file_modified_date(path) {
            Some(date) => (ResolvedDate::Known(date), DateSource::FileModified),
            None => {
                debug!("更新日時を取得できませんでした: {}", path.display());
                (ResolvedDate::Unknown, DateSource::None)
            }
        }
    }

    fn embedded_date(&self, path: &Path, kind: MediaKind) -> Option<(NaiveDate, DateSource)> {
        if !self.embedded_metadata {
            return None;
        }

        let attempt = match kind {
            MediaKind::Image => read_date_time_original(path).map(|dt| (dt, DateSource::Exif)),
            MediaKind::HeicImage if heic::is_available() => {
                heic::read_date_time_original(path).map(|dt| (dt, DateSource::Heic))
            }
            MediaKind::HeicImage | MediaKind::Video | MediaKind::Unsupported => return None,
        };

        match attempt {
            Ok((dt, source)) => Some((dt.date(), source)),
            Err(err) => {
                debug!("埋め込み日時なし、更新日時へフォールバック: {err:#}");
                None
            }
        }
    }
}

fn file_modified_date(path: &Path) -> Option<NaiveDate> {
    let time = fs::metadata(path).ok()?.modified().ok()?;
    let date = local_date(time);
    if date.is_none() {
        debug!("更新日時が範囲外です: {}", path.display());
    }
    date
}

/// Local calendar date of `time`, or `None` when chrono cannot represent it.
fn local_date(time: SystemTime) -> Option<NaiveDate> {
    let (secs, nanos) = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (i64::try_from(after.as_secs()).ok()?, after.subsec_nanos()),
        Err(err) => {
            let before = err.duration();
            let secs = i64::try_from(before.as_secs()).ok()?;
            match before.subsec_nanos() {
                0 => (-secs, 0),
                nanos => ((-secs).checked_sub(1)?, 1_000_000_000 - nanos),
            }
        }
    };
    let utc = DateTime::<Utc>::from_timestamp(secs, nanos)?;
    Some(utc.with_timezone(&Local).date_naive())
}
