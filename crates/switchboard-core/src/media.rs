//! Media classification by file name.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of an outbound file, used to pick the platform upload method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
    Audio,
    Document,
}

const PHOTO: &[&str] = &["jpeg", "jpg", "bmp", "gif", "png", "webp", "wbmp", "heic"];
const VIDEO: &[&str] = &["mpg", "mp4", "avi", "mov", "mkv", "flv", "webm"];
const AUDIO: &[&str] = &["m4a", "mp3", "wav", "wma", "ogg", "aac"];
const DOCUMENT: &[&str] = &["txt", "doc", "docx", "xls", "xlsx", "pdf", "tiff"];

impl MediaType {
    /// Classifies a file name or URL path by its extension.
    ///
    /// Returns `None` for names without an extension or with an unknown one.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.split(['?', '#']).next().unwrap_or(name);
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        [
            (Self::Photo, PHOTO),
            (Self::Video, VIDEO),
            (Self::Audio, AUDIO),
            (Self::Document, DOCUMENT),
        ]
        .into_iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(kind, _)| kind)
    }

    /// Like [`from_file_name`](Self::from_file_name), falling back to a document.
    pub fn classify(name: &str) -> Self {
        Self::from_file_name(name).unwrap_or(Self::Document)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
