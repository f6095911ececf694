use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Layout of `DateTimeOriginal` as written by cameras.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Reads `DateTimeOriginal` from a JPEG, PNG or TIFF container.
pub fn read_date_time_original(path: &Path) -> Result<NaiveDateTime> {
    let file = File::open(path)
        .with_context(|| format!("EXIF読み込み対象を開けませんでした: {}", path.display()))?;
    let mut buf = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf)
        .with_context(|| format!("EXIFを解析できませんでした: {}", path.display()))?;

    date_time_original(&exif)
        .with_context(|| format!("DateTimeOriginalがありません: {}", path.display()))
}

/// Same extraction for a bare TIFF-structured EXIF payload, as embedded in HEIC items.
#[cfg_attr(not(feature = "heic"), allow(dead_code))]
pub fn date_time_original_from_tiff(tiff: Vec<u8>) -> Result<NaiveDateTime> {
    let exif = Reader::new()
        .read_raw(tiff)
        .context("EXIFペイロードを解析できませんでした")?;
    date_time_original(&exif).context("DateTimeOriginalがありません")
}

fn date_time_original(exif: &Exif) -> Option<NaiveDateTime> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .find_map(|raw| std::str::from_utf8(raw).ok())
            .and_then(parse_exif_datetime),
        _ => None,
    }
}

pub fn parse_exif_datetime(input: &str) -> Option<NaiveDateTime> {
    let normalized = input.trim().trim_end_matches('\0');
    NaiveDateTime::parse_from_str(normalized, EXIF_DATETIME_FORMAT).ok()
}

/// Little-endian TIFF block holding only IFD0 -> Exif IFD -> DateTimeOriginal.
#[cfg(test)]
pub(crate) fn tiff_with_date_time_original(value: &str) -> Vec<u8> {
    assert_eq!(value.len(), 19, "EXIF datetime is always 19 chars");
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
    tiff
}

#[cfg(test)]
pub(crate) fn jpeg_with_tiff(tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let segment_len = u16::try_from(2 + 6 + tiff.len()).expect("APP1 fits in u16");
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}
