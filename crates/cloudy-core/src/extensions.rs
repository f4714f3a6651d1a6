//! The static extension table.
//!
//! Categories map to sets of lowercase extensions. The table is a compile-time
//! constant; per-storage whitelists are configuration, not mutations of it.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtensionCategory {
    Text,
    Document,
    Image,
    Audio,
    Data,
    Script,
    Archive,
    Other,
}

impl ExtensionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionCategory::Text => "TEXT",
            ExtensionCategory::Document => "DOCUMENT",
            ExtensionCategory::Image => "IMAGE",
            ExtensionCategory::Audio => "AUDIO",
            ExtensionCategory::Data => "DATA",
            ExtensionCategory::Script => "SCRIPT",
            ExtensionCategory::Archive => "ARCHIVE",
            ExtensionCategory::Other => "OTHER",
        }
    }

    /// Extensions belonging to this category. `Other` has none.
    pub fn extensions(self) -> &'static [&'static str] {
        EXTENSION_TABLE
            .iter()
            .find(|(category, _)| *category == self)
            .map(|(_, exts)| *exts)
            .unwrap_or(&[])
    }
}

impl fmt::Display for ExtensionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const EXTENSION_TABLE: &[(ExtensionCategory, &[&str])] = &[
    (ExtensionCategory::Text, &["txt", "md"]),
    (
        ExtensionCategory::Document,
        &[
            "rtf", "odf", "ods", "gnumeric", "abw", "doc", "docx", "xls", "xlsx",
        ],
    ),
    (
        ExtensionCategory::Image,
        &["jpg", "jpeg", "jpe", "png", "gif", "svg", "bmp", "webp"],
    ),
    (
        ExtensionCategory::Audio,
        &["wav", "mp3", "aac", "ogg", "oga", "flac"],
    ),
    (
        ExtensionCategory::Data,
        &["csv", "ini", "json", "plist", "xml", "yaml", "yml"],
    ),
    (
        ExtensionCategory::Script,
        &["js", "php", "pl", "py", "rb", "sh"],
    ),
    (
        ExtensionCategory::Archive,
        &["gz", "bz2", "zip", "tar", "tgz", "txz", "7z"],
    ),
];

/// Categories accepted for upload when no whitelist is configured.
pub const DEFAULT_ALLOWED_CATEGORIES: &[ExtensionCategory] = &[
    ExtensionCategory::Text,
    ExtensionCategory::Document,
    ExtensionCategory::Image,
    ExtensionCategory::Audio,
    ExtensionCategory::Data,
];

/// Category of a bare (already lowercased) extension.
pub fn category_of(extension: &str) -> ExtensionCategory {
    if extension.is_empty() {
        return ExtensionCategory::Other;
    }
    EXTENSION_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&extension))
        .map(|(category, _)| *category)
        .unwrap_or(ExtensionCategory::Other)
}

pub fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_CATEGORIES
        .iter()
        .flat_map(|c| c.extensions().iter().map(|e| e.to_string()))
        .collect()
}
