//! Validation of user-selected files into previewable uploads.

use std::path::Path;

use base64::Engine;
use serde::{Serialize, Serializer};

use crate::error::StudioError;

/// Largest accepted upload: 15 MiB.
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

/// MIME types accepted by the upload slots.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// A file as handed over by the selection surface: name, declared type, bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawFile {
    /// File name, kept through cropping.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// File contents. Cassettes record only the length.
    #[serde(rename = "size", serialize_with = "serialize_len")]
    pub bytes: Vec<u8>,
}

fn serialize_len<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

impl RawFile {
    /// Create a file from in-memory parts.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes }
    }

    /// Read a file from disk.
    ///
    /// The MIME type comes from the extension, or from the content when the
    /// extension is not a known image format.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self, StudioError> {
        let bytes = std::fs::read(path)?;
        let mime_type = image::ImageFormat::from_path(path)
            .or_else(|_| image::guess_format(&bytes))
            .map_or("application/octet-stream", |f| f.to_mime_type())
            .to_string();
        let name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, mime_type, bytes))
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A validated file together with its on-screen preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upload {
    /// The original file.
    pub file: RawFile,
    /// Lossless `data:` URI of the file bytes.
    #[serde(skip)]
    pub preview_url: String,
}

impl Upload {
    /// Wrap a file produced by this crate, such as a crop, without re-validating it.
    #[must_use]
    pub fn derived(file: RawFile) -> Self {
        let preview_url = to_data_url(&file.mime_type, &file.bytes);
        Self { file, preview_url }
    }
}

/// Validate a file and build its preview.
///
/// The size limit is checked first; a rejected file never becomes an
/// [`Upload`].
///
/// # Errors
///
/// Returns [`StudioError::FileTooLarge`] or [`StudioError::UnsupportedMediaType`].
pub fn ingest(file: RawFile) -> Result<Upload, StudioError> {
    let size = file.size();
    if size > MAX_UPLOAD_BYTES {
        return Err(StudioError::FileTooLarge { name: file.name, size, limit: MAX_UPLOAD_BYTES });
    }
    if !ACCEPTED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(StudioError::UnsupportedMediaType {
            name: file.name,
            mime_type: file.mime_type,
        });
    }
    Ok(Upload::derived(file))
}

/// Encode bytes as a base64 `data:` URI.
#[must_use]
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{encoded}")
}
