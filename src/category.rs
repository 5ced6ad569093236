//! Static extension -> fileType classification table (spec.md §4.2) and the
//! category -> viewer hint mapping consumed by extraction (§4.3).
//!
//! Consolidated into one place, the way the teacher consolidates language
//! detection into a single `lang::detect_language` used by every caller.

use crate::model::{FileType, ViewerHint};

/// Classify a lowercased, dot-stripped extension into a `FileType` per the
/// static table in spec.md §4.2.
pub fn classify_extension(ext: &str) -> FileType {
    match ext {
        "md" | "txt" | "log" | "rst" => FileType::Document,
        "js" | "ts" | "py" | "java" | "c" | "cpp" | "go" | "rs" | "rb" | "php" | "sh" | "json"
        | "xml" | "yml" | "yaml" | "html" | "css" => FileType::Code,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" => FileType::Image,
        "pdf" => FileType::Pdf,
        "zip" | "rar" | "7z" | "tar" | "gz" => FileType::Archive,
        "mp3" | "wav" | "flac" => FileType::Audio,
        "mp4" | "mov" | "webm" => FileType::Video,
        _ => FileType::Other,
    }
}

/// The viewer hint for binary/known categories that never get decoded as
/// text (spec.md §4.3: image/pdf/archive/audio/video).
pub fn binary_viewer_hint(file_type: FileType) -> Option<ViewerHint> {
    match file_type {
        FileType::Image => Some(ViewerHint::Image),
        FileType::Pdf => Some(ViewerHint::Pdf),
        FileType::Archive | FileType::Video | FileType::Audio => Some(ViewerHint::Binary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(classify_extension("md"), FileType::Document);
        assert_eq!(classify_extension("rs"), FileType::Code);
        assert_eq!(classify_extension("png"), FileType::Image);
        assert_eq!(classify_extension("pdf"), FileType::Pdf);
        assert_eq!(classify_extension("zip"), FileType::Archive);
        assert_eq!(classify_extension("mp3"), FileType::Audio);
        assert_eq!(classify_extension("mp4"), FileType::Video);
        assert_eq!(classify_extension("xyz"), FileType::Other);
    }
}
