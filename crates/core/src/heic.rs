//! `DateTimeOriginal` for HEIC/HEIF images.
//!
//! The EXIF block of a HEIF file lives in an item of type `Exif`, declared in
//! `meta/iinf` and located through `meta/iloc`. The item payload starts with a
//! big-endian offset to the TIFF header, followed by the regular EXIF TIFF
//! structure. Built without the `heic` feature this module always reports the
//! decoder as unavailable.

use anyhow::Result;
use chrono::NaiveDateTime;
use std::path::Path;

pub fn is_available() -> bool {
    cfg!(feature = "heic")
}

#[cfg(feature = "heic")]
pub fn read_date_time_original(path: &Path) -> Result<NaiveDateTime> {
    use anyhow::Context;

    let data = std::fs::read(path)
        .with_context(|| format!("HEIC読み込み対象を開けませんでした: {}", path.display()))?;
    let payload = container::exif_item_payload(&data)
        .with_context(|| format!("HEICのExifアイテムを取得できませんでした: {}", path.display()))?;
    let tiff = container::tiff_from_exif_item(&payload)?;
    crate::exif_reader::date_time_original_from_tiff(tiff.to_vec())
}

#[cfg(not(feature = "heic"))]
pub fn read_date_time_original(path: &Path) -> Result<NaiveDateTime> {
    anyhow::bail!("HEIC非対応のビルドです: {}", path.display())
}

#[cfg(feature = "heic")]
mod container {
    use anyhow::{bail, Context, Result};

    const EXIF_ITEM_TYPE: &[u8; 4] = b"Exif";

    #[derive(Debug, Clone, Copy)]
    struct BmffBox<'a> {
        kind: [u8; 4],
        body: &'a [u8],
        /// Absolute offset of `body` within the file.
        body_offset: usize,
    }

    struct ByteReader<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> ByteReader<'a> {
        fn new(data: &'a [u8]) -> Self {
            Self { data, pos: 0 }
        }

        fn take(&mut self, len: usize) -> Result<&'a [u8]> {
            let end = self
                .pos
                .checked_add(len)
                .filter(|end| *end <= self.data.len())
                .context("ボックスが途中で切れています")?;
            let bytes = &self.data[self.pos..end];
            self.pos = end;
            Ok(bytes)
        }

        fn u8(&mut self) -> Result<u8> {
            Ok(self.take(1)?[0])
        }

        fn u16(&mut self) -> Result<u16> {
            let b = self.take(2)?;
            Ok(u16::from_be_bytes([b[0], b[1]]))
        }

        fn u32(&mut self) -> Result<u32> {
            let b = self.take(4)?;
            Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        }

        fn u64(&mut self) -> Result<u64> {
            let b = self.take(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(b);
            Ok(u64::from_be_bytes(raw))
        }

        /// Unsigned integer of 0, 4 or 8 bytes, as used by `iloc`.
        fn sized(&mut self, size: u8) -> Result<u64> {
            match size {
                0 => Ok(0),
                4 => Ok(u64::from(self.u32()?)),
                8 => self.u64(),
                other => bail!("未対応のフィールド長です: {other}"),
            }
        }

        /// Version byte of a FullBox; the 24-bit flags are skipped.
        fn full_box_version(&mut self) -> Result<u8> {
            let version = self.u8()?;
            self.take(3)?;
            Ok(version)
        }

        fn rest(&self) -> &'a [u8] {
            &self.data[self.pos..]
        }
    }

    fn children(data: &[u8], base: usize) -> Result<Vec<BmffBox<'_>>> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            let mut reader = ByteReader::new(&data[pos..]);
            let size32 = reader.u32()?;
            let mut kind = [0u8; 4];
            kind.copy_from_slice(reader.take(4)?);
            let size = match size32 {
                0 => data.len() - pos,
                1 => usize::try_from(reader.u64()?).context("ボックスサイズが大きすぎます")?,
                n => n as usize,
            };
            let header_len = reader.pos;
            if size < header_len || size > data.len() - pos {
                bail!("ボックスサイズが不正です: {}", String::from_utf8_lossy(&kind));
            }
            out.push(BmffBox {
                kind,
                body: &data[pos + header_len..pos + size],
                body_offset: base + pos + header_len,
            });
            pos += size;
        }
        Ok(out)
    }

    fn find<'a>(boxes: &[BmffBox<'a>], kind: &[u8; 4]) -> Option<BmffBox<'a>> {
        boxes.iter().find(|b| &b.kind == kind).copied()
    }

    /// Concatenated extents of the first item whose `infe` type is `Exif`.
    pub(super) fn exif_item_payload(data: &[u8]) -> Result<Vec<u8>> {
        let top = children(data, 0)?;
        let meta = find(&top, b"meta").context("metaボックスがありません")?;
        let mut meta_reader = ByteReader::new(meta.body);
        meta_reader.full_box_version()?;
        let meta_children = children(meta_reader.rest(), meta.body_offset + meta_reader.pos)?;

        let iinf = find(&meta_children, b"iinf").context("iinfボックスがありません")?;
        let item_id = find_exif_item_id(iinf)?.context("Exifアイテムがありません")?;

        let iloc = find(&meta_children, b"iloc").context("ilocボックスがありません")?;
        let idat = find(&meta_children, b"idat");
        read_item(data, iloc, idat, item_id)
    }

    fn find_exif_item_id(iinf: BmffBox<'_>) -> Result<Option<u32>> {
        let mut reader = ByteReader::new(iinf.body);
        let version = reader.full_box_version()?;
        if version == 0 {
            reader.u16()?;
        } else {
            reader.u32()?;
        }

        for infe in children(reader.rest(), 0)? {
            if &infe.kind != b"infe" {
                continue;
            }
            let mut entry = ByteReader::new(infe.body);
            let version = entry.full_box_version()?;
            if version < 2 {
                continue;
            }
            let item_id = if version == 2 {
                u32::from(entry.u16()?)
            } else {
                entry.u32()?
            };
            entry.u16()?;
            if entry.take(4)? == EXIF_ITEM_TYPE {
                return Ok(Some(item_id));
            }
        }
        Ok(None)
    }

    fn read_item(
        data: &[u8],
        iloc: BmffBox<'_>,
        idat: Option<BmffBox<'_>>,
        wanted: u32,
    ) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(iloc.body);
        let version = reader.full_box_version()?;
        let sizes = reader.u8()?;
        let (offset_size, length_size) = (sizes >> 4, sizes & 0x0F);
        let sizes = reader.u8()?;
        let base_offset_size = sizes >> 4;
        let index_size = if version == 0 { 0 } else { sizes & 0x0F };
        let item_count = if version < 2 {
            u32::from(reader.u16()?)
        } else {
            reader.u32()?
        };

        for _ in 0..item_count {
            let item_id = if version < 2 {
                u32::from(reader.u16()?)
            } else {
                reader.u32()?
            };
            let construction_method = if version == 0 { 0 } else { reader.u16()? & 0x0F };
            reader.u16()?;
            let base_offset = reader.sized(base_offset_size)?;
            let extent_count = reader.u16()?;

            let mut extents = Vec::with_capacity(usize::from(extent_count));
            for _ in 0..extent_count {
                if index_size > 0 {
                    reader.sized(index_size)?;
                }
                let offset = reader.sized(offset_size)?;
                let length = reader.sized(length_size)?;
                extents.push((offset, length));
            }

            if item_id != wanted {
                continue;
            }

            let source = match construction_method {
                0 => data,
                1 => idat.context("idatボックスがありません")?.body,
                other => bail!("未対応のconstruction_methodです: {other}"),
            };

            let mut payload = Vec::new();
            for (offset, length) in extents {
                let start = base_offset
                    .checked_add(offset)
                    .and_then(|start| usize::try_from(start).ok())
                    .context("オフセットが不正です")?;
                let end = if length == 0 {
                    source.len()
                } else {
                    start
                        .checked_add(usize::try_from(length).context("長さが不正です")?)
                        .context("長さが不正です")?
                };
                if start > end || end > source.len() {
                    bail!("アイテムの範囲がファイル外です");
                }
                payload.extend_from_slice(&source[start..end]);
            }
            return Ok(payload);
        }

        bail!("ilocにExifアイテム{wanted}の位置がありません")
    }

    pub(super) fn tiff_from_exif_item(payload: &[u8]) -> Result<&[u8]> {
        let mut reader = ByteReader::new(payload);
        let header_offset = reader.u32()? as usize;
        reader.take(header_offset)?;
        let tiff = reader.rest();
        if tiff.len() < 8 {
            bail!("Exifペイロードが短すぎます");
        }
        Ok(tiff)
    }

    /// Minimal `ftyp` + `meta` + `mdat` file carrying one Exif item.
    #[cfg(test)]
    pub(crate) fn heic_with_tiff(tiff: &[u8]) -> Vec<u8> {
        fn boxed(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
            let mut out = Vec::with_capacity(body.len() + 8);
            out.extend_from_slice(&u32::try_from(body.len() + 8).expect("small box").to_be_bytes());
            out.extend_from_slice(kind);
            out.extend_from_slice(body);
            out
        }

        let mut item = Vec::new();
        item.extend_from_slice(&6u32.to_be_bytes());
        item.extend_from_slice(b"Exif\0\0");
        item.extend_from_slice(tiff);

        let build_meta = |extent_offset: u32| {
            let mut hdlr = vec![0u8; 8];
            hdlr.extend_from_slice(b"pict");
            hdlr.extend_from_slice(&[0u8; 13]);

            let mut infe = vec![2, 0, 0, 0];
            infe.extend_from_slice(&1u16.to_be_bytes());
            infe.extend_from_slice(&0u16.to_be_bytes());
            infe.extend_from_slice(EXIF_ITEM_TYPE);
            infe.push(0);
            let mut iinf = vec![0, 0, 0, 0];
            iinf.extend_from_slice(&1u16.to_be_bytes());
            iinf.extend_from_slice(&boxed(b"infe", &infe));

            let mut iloc = vec![0, 0, 0, 0, 0x44, 0x00];
            iloc.extend_from_slice(&1u16.to_be_bytes());
            iloc.extend_from_slice(&1u16.to_be_bytes());
            iloc.extend_from_slice(&0u16.to_be_bytes());
            iloc.extend_from_slice(&1u16.to_be_bytes());
            iloc.extend_from_slice(&extent_offset.to_be_bytes());
            iloc.extend_from_slice(&u32::try_from(item.len()).expect("small item").to_be_bytes());

            let mut meta = vec![0, 0, 0, 0];
            meta.extend_from_slice(&boxed(b"hdlr", &hdlr));
            meta.extend_from_slice(&boxed(b"iinf", &iinf));
            meta.extend_from_slice(&boxed(b"iloc", &iloc));
            boxed(b"meta", &meta)
        };

        let mut ftyp_body = b"heic".to_vec();
        ftyp_body.extend_from_slice(&0u32.to_be_bytes());
        ftyp_body.extend_from_slice(b"mif1heic");
        let ftyp = boxed(b"ftyp", &ftyp_body);

        let meta_len = build_meta(0).len();
        let extent_offset = u32::try_from(ftyp.len() + meta_len + 8).expect("small file");

        let mut file = ftyp;
        file.extend_from_slice(&build_meta(extent_offset));
        file.extend_from_slice(&boxed(b"mdat", &item));
        file
    }
}

#[cfg(all(test, feature = "heic"))]
pub(crate) use container::heic_with_tiff;
