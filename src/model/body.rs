//! Message body tree as reported by `notmuch show --format=json`.

use serde::Deserialize;

/// One node of a message body.
///
/// Leaves carry their text in `content`; multipart nodes carry their
/// children. Non-text leaves (most attachments) have no content at all.
#[derive(Debug, Clone, Deserialize)]
pub struct BodyPart {
    /// Index-assigned part number, usable with `notmuch show --part`.
    pub id: u32,

    #[serde(rename = "content-type")]
    pub content_type: String,

    #[serde(rename = "content-disposition", default)]
    pub disposition: Option<String>,

    #[serde(default)]
    pub filename: Option<String>,

    /// Declared decoded size. Only present on parts whose content is omitted.
    #[serde(rename = "content-length", default)]
    pub content_length: Option<u64>,

    #[serde(default)]
    pub content: Option<PartContent>,
}

/// Payload of a body part.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PartContent {
    Text(String),
    Parts(Vec<BodyPart>),
    /// Anything else (embedded `message/rfc822`, encrypted parts). Kept so
    /// listing a message never fails on a part that is never rendered.
    Opaque(serde_json::Value),
}

impl BodyPart {
    /// Lowercased MIME type.
    pub fn mime_type(&self) -> String {
        self.content_type.to_ascii_lowercase()
    }

    pub fn is_attachment(&self) -> bool {
        self.disposition
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("attachment"))
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type().starts_with("multipart/")
    }

    /// Child parts, or an empty slice for leaves.
    pub fn children(&self) -> &[BodyPart] {
        match &self.content {
            Some(PartContent::Parts(parts)) => parts,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(PartContent::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Depth-first search for a part by id.
    pub fn find(&self, id: u32) -> Option<&BodyPart> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_nested_parts() {
        let json = serde_json::json!({
            "id": 1,
            "content-type": "multipart/mixed",
            "content": [
                {"id": 2, "content-type": "text/plain", "content": "hi"},
                {
                    "id": 3,
                    "content-type": "application/pdf",
                    "content-disposition": "attachment",
                    "filename": "report.pdf",
                    "content-length": 2048
                }
            ]
        });
        let part: BodyPart = serde_json::from_value(json).unwrap();
        assert!(part.is_multipart());
        assert_eq!(part.children().len(), 2);
        assert_eq!(part.children()[0].text(), Some("hi"));

        let pdf = part.find(3).unwrap();
        assert!(pdf.is_attachment());
        assert!(pdf.content.is_none());
        assert_eq!(pdf.content_length, Some(2048));
        assert!(part.find(9).is_none());
    }

    #[test]
    fn test_embedded_message_is_opaque() {
        let json = serde_json::json!({
            "id": 4,
            "content-type": "message/rfc822",
            "content": [{"headers": {"Subject": "fwd"}, "body": []}]
        });
        let part: BodyPart = serde_json::from_value(json).unwrap();
        assert!(matches!(part.content, Some(PartContent::Opaque(_))));
        assert!(part.children().is_empty());
    }

    #[test]
    fn test_mime_type_is_case_insensitive() {
        let json = serde_json::json!({"id": 1, "content-type": "Text/HTML", "content": "<p>x</p>"});
        let part: BodyPart = serde_json::from_value(json).unwrap();
        assert_eq!(part.mime_type(), "text/html");
    }
}
