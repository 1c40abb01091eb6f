//! Local photo staging.
//! A selected file is checked (image MIME type, size limit), read and encoded
//! as a base64 data URL. Nothing leaves the machine until the edit is committed.

use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat;
use std::path::Path;

use crate::error::ValidationError;

/// A photo read from disk and held in memory until commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedPhoto {
    pub file_name: String,
    pub mime: String,
    pub data_url: String,
}

impl StagedPhoto {
    /// Base64 part only, as the upload endpoint expects it.
    pub fn base64_payload(&self) -> &str {
        strip_data_url_header(&self.data_url)
    }
}

/// Reads and validates a local image file.
pub fn stage_from_file(path: &Path, max_bytes: u64) -> Result<StagedPhoto, ValidationError> {
    let unreadable = |reason: String| ValidationError::UnreadablePhoto {
        path: path.display().to_string(),
        reason,
    };

    let mime = mime_for_path(path);
    if !mime.starts_with("image/") {
        return Err(ValidationError::NotAnImage { mime });
    }

    let size = std::fs::metadata(path).map_err(|e| unreadable(e.to_string()))?.len();
    if size > max_bytes {
        return Err(ValidationError::PhotoTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::debug!(file = %file_name, %mime, size, "photo staged");
    Ok(StagedPhoto {
        file_name,
        data_url: to_data_url(&mime, &bytes),
        mime,
    })
}

/// MIME type from the file extension; unknown extensions are not images.
pub fn mime_for_path(path: &Path) -> String {
    match ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Drops a leading `data:image/<subtype>;base64,` header, if any.
pub fn strip_data_url_header(data: &str) -> &str {
    let Some(rest) = data.strip_prefix("data:image/") else {
        return data;
    };
    match rest.split_once(";base64,") {
        Some((subtype, payload))
            if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            payload
        }
        _ => data,
    }
}

/// Decodes a base64 data URL back into bytes. Remote URLs yield `None`.
pub fn decode_data_url(data: &str) -> Option<Vec<u8>> {
    let (_, payload) = data.strip_prefix("data:")?.split_once(";base64,")?;
    general_purpose::STANDARD.decode(payload).ok()
}
