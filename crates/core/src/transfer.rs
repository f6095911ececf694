use anyhow::{bail, Context, Result};
use filetime::FileTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

impl TransferMode {
    /// Word used in transfer-log lines.
    pub fn past_tense(self) -> &'static str {
        match self {
            TransferMode::Copy => "Copied",
            TransferMode::Move => "Moved",
        }
    }

    /// Word used in audit-trail error lines.
    pub fn gerund(self) -> &'static str {
        match self {
            TransferMode::Copy => "copying",
            TransferMode::Move => "moving",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Copies or moves `src` to `dst`. Never overwrites `dst` and never panics;
/// every problem comes back as [`Outcome::Failed`].
pub fn transfer(src: &Path, dst: &Path, mode: TransferMode) -> Outcome {
    let result = match mode {
        TransferMode::Copy => copy_preserving_times(src, dst),
        TransferMode::Move => move_file(src, dst),
    };
    match result {
        Ok(()) => Outcome::Success,
        Err(err) => Outcome::Failed(format!("{err:#}")),
    }
}

fn copy_preserving_times(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::metadata(src)
        .with_context(|| format!("コピー元を読めませんでした: {}", src.display()))?;
    let mut reader =
        File::open(src).with_context(|| format!("コピー元を開けませんでした: {}", src.display()))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .with_context(|| format!("コピー先を作成できませんでした: {}", dst.display()))?;
    io::copy(&mut reader, &mut writer).with_context(|| {
        format!("コピーに失敗しました: {} -> {}", src.display(), dst.display())
    })?;
    writer
        .sync_all()
        .with_context(|| format!("コピー先を書き込めませんでした: {}", dst.display()))?;
    drop(writer);

    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .with_context(|| format!("タイムスタンプを設定できませんでした: {}", dst.display()))?;
    fs::set_permissions(dst, meta.permissions())
        .with_context(|| format!("パーミッションを設定できませんでした: {}", dst.display()))?;
    Ok(())
}

fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::symlink_metadata(dst).is_ok() {
        bail!("移動先が既に存在します: {}", dst.display());
    }

    let rename_err = match fs::rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    if !src.exists() {
        return Err(anyhow::Error::from(rename_err)
            .context(format!("移動元が見つかりません: {}", src.display())));
    }
    debug!(
        "rename不可のためコピー後に削除します: {} -> {} ({rename_err})",
        src.display(),
        dst.display()
    );

    copy_then_remove(src, dst)
        .with_context(|| format!("移動に失敗しました (rename: {rename_err})"))
}

/// Move fallback across filesystems. A failure leaves whatever exists in place:
/// a partial copy is not deleted and the source is kept if it cannot be removed.
fn copy_then_remove(src: &Path, dst: &Path) -> Result<()> {
    copy_preserving_times(src, dst)?;
    fs::remove_file(src)
        .with_context(|| format!("移動元を削除できませんでした: {}", src.display()))?;
    Ok(())
}
