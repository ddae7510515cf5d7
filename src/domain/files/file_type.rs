use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quota bucket a file is accounted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Image,
    Video,
    Audio,
    Other,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Document,
        FileType::Image,
        FileType::Video,
        FileType::Audio,
        FileType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Document => "document",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown file type: {0}")]
pub struct UnknownFileType(pub String);

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "document" => Ok(FileType::Document),
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            "audio" => Ok(FileType::Audio),
            "other" => Ok(FileType::Other),
            other => Err(UnknownFileType(other.to_string())),
        }
    }
}

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "xls", "xlsx", "csv", "rtf", "ods", "ppt", "odp", "md", "html",
    "htm", "epub", "pages", "fig", "psd", "ai", "indd", "xd", "sketch", "afdesign", "afphoto",
];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

/// Derive the bucket and lowercased extension from a stored file name.
/// Names without a dot have an empty extension and land in `Other`.
pub fn classify(file_name: &str) -> (FileType, String) {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if extension.is_empty() {
        return (FileType::Other, extension);
    }
    let ext = extension.as_str();
    let file_type = if DOCUMENT_EXTENSIONS.contains(&ext) {
        FileType::Document
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        FileType::Image
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        FileType::Video
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        FileType::Audio
    } else {
        FileType::Other
    };
    (file_type, extension)
}
