use std::path::PathBuf;

use shared::domain::FileDescriptor;
use thiserror::Error;

use crate::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("File {name} exceeds {limit} limit")]
    TooLarge { name: String, limit: String },
    #[error("File {name} has invalid format")]
    UnsupportedType { name: String, mime_type: String },
    #[error("File {name} not added: at most {max} attachments are allowed")]
    TooMany { name: String, max: usize },
}

/// Size, type and count limits applied to every candidate attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePolicy {
    pub max_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub max_files: usize,
}

impl FilePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_size_bytes: settings.max_file_size,
            allowed_mime_types: settings.allowed_file_types.clone(),
            max_files: settings.max_files,
        }
    }

    /// Checks one file against the policy given how many files are already accepted.
    pub fn check(&self, file: &FileDescriptor, accepted: usize) -> Result<(), FileRejection> {
        if file.size_bytes > self.max_size_bytes {
            return Err(FileRejection::TooLarge {
                name: file.name.clone(),
                limit: format_file_size(self.max_size_bytes),
            });
        }
        if !self
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&file.mime_type))
        {
            return Err(FileRejection::UnsupportedType {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            });
        }
        if accepted >= self.max_files {
            return Err(FileRejection::TooMany {
                name: file.name.clone(),
                max: self.max_files,
            });
        }
        Ok(())
    }
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Where the bytes of an accepted attachment come from at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub descriptor: FileDescriptor,
    pub source: AttachmentSource,
}

impl Attachment {
    pub fn in_memory(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            descriptor: FileDescriptor::new(name, bytes.len() as u64, mime_type),
            source: AttachmentSource::Memory(bytes),
        }
    }

    pub fn from_path(descriptor: FileDescriptor, path: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            source: AttachmentSource::Path(path.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileIcon {
    Pdf,
    Image,
    Word,
    Generic,
}

pub fn file_icon(mime_type: &str) -> FileIcon {
    if mime_type.contains("pdf") {
        FileIcon::Pdf
    } else if mime_type.contains("image") {
        FileIcon::Image
    } else if mime_type.contains("word") || mime_type.contains("document") {
        FileIcon::Word
    } else {
        FileIcon::Generic
    }
}

/// Human-readable size with base-1024 units, rounded to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
