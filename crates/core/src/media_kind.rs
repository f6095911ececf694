use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    HeicImage,
    Video,
    Unsupported,
}

/// Extensions the sorter transfers, lower case and without the dot.
pub static SUPPORTED_EXTENSIONS: [(&str, MediaKind); 8] = [
    ("jpg", MediaKind::Image),
    ("jpeg", MediaKind::Image),
    ("png", MediaKind::Image),
    ("heic", MediaKind::HeicImage),
    ("mov", MediaKind::Video),
    ("mp4", MediaKind::Video),
    ("avi", MediaKind::Video),
    ("mkv", MediaKind::Video),
];

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|ext| Self::from_extension(&ext.to_string_lossy()))
            .unwrap_or(MediaKind::Unsupported)
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.');
        SUPPORTED_EXTENSIONS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|(_, kind)| *kind)
            .unwrap_or(MediaKind::Unsupported)
    }

    pub fn is_supported(self) -> bool {
        self != MediaKind::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::MediaKind;
    use std::path::Path;

    #[test]
    fn classifies_by_extension_ignoring_case() {
        assert_eq!(MediaKind::from_path(Path::new("a/IMG_1.JPG")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("b.Jpeg")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("c.png")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("d.HEIC")), MediaKind::HeicImage);
        assert_eq!(MediaKind::from_path(Path::new("e.MoV")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("f.mkv")), MediaKind::Video);
    }

    #[test]
    fn unknown_or_missing_extension_is_unsupported() {
        assert_eq!(MediaKind::from_path(Path::new("doc.pdf")), MediaKind::Unsupported);
        assert_eq!(MediaKind::from_path(Path::new("README")), MediaKind::Unsupported);
        assert_eq!(MediaKind::from_path(Path::new(".jpg")), MediaKind::Unsupported);
        assert!(!MediaKind::Unsupported.is_supported());
        assert!(MediaKind::Video.is_supported());
    }

    #[test]
    fn from_extension_accepts_leading_dot() {
        assert_eq!(MediaKind::from_extension(".mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("heif"), MediaKind::Unsupported);
    }
}
