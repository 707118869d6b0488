//! Attachment references.
//!
//! A reference only names a body part. The bytes are fetched from the
//! index on request (see `IndexClient::fetch_attachment`).

use super::body::BodyPart;

/// Metadata about an attachment part of a message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttachmentRef {
    /// Index-assigned part number.
    pub part: u32,

    /// Filename of the attachment. Generated if missing from the part.
    pub filename: String,

    /// Declared MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,

    /// Declared decoded size in bytes, when the index reports one.
    pub size: Option<u64>,
}

impl AttachmentRef {
    pub fn from_part(part: &BodyPart) -> Self {
        Self {
            part: part.id,
            filename: part
                .filename
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("attachment_{}", part.id)),
            content_type: part.mime_type(),
            size: part
                .content_length
                .or_else(|| part.text().map(|t| t.len() as u64)),
        }
    }
}

/// A fetched attachment: fresh metadata plus the raw part bytes.
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    pub meta: AttachmentRef,
    pub data: Vec<u8>,
}
