//! Flattening of a body tree into displayable text, and attachment listing.

use tracing::debug;

use crate::error::{EpistleError, Result};
use crate::model::attachment::AttachmentRef;
use crate::model::body::BodyPart;
use crate::render::HtmlRenderer;

const MULTIPART_TYPES: [&str; 3] = [
    "multipart/alternative",
    "multipart/mixed",
    "multipart/related",
];

/// Render one body part (and whatever it contains) to plain text.
///
/// Multipart nodes pick their `text/plain` child, else their `text/html`
/// child, else descend into their first child. Children marked as
/// attachments are not candidates for the first two picks.
pub fn render_body(part: &BodyPart, renderer: &dyn HtmlRenderer) -> Result<String> {
    let mime = part.mime_type();
    match mime.as_str() {
        m if MULTIPART_TYPES.contains(&m) => {
            let children = part.children();
            let inline_of_type = |wanted: &str| {
                children
                    .iter()
                    .find(|c| !c.is_attachment() && c.mime_type() == wanted)
            };

            let chosen = inline_of_type("text/plain")
                .or_else(|| inline_of_type("text/html"))
                .or_else(|| children.first())
                .ok_or(EpistleError::EmptyBody(part.id))?;
            debug!(part = part.id, chosen = chosen.id, "Selected alternative");
            render_body(chosen, renderer)
        }
        "text/plain" => Ok(leaf_text(part)?.to_string()),
        "text/html" => renderer.render(leaf_text(part)?),
        _ => Err(EpistleError::UnknownContentType {
            part: part.id,
            content_type: part.content_type.clone(),
        }),
    }
}

fn leaf_text(part: &BodyPart) -> Result<&str> {
    part.text().ok_or_else(|| {
        EpistleError::MalformedDocument(format!(
            "{} part {} has no text content",
            part.content_type, part.id
        ))
    })
}

/// List every attachment reachable through multipart nodes, in tree order.
///
/// A leaf passed in directly never counts as an attachment.
pub fn collect_attachments(part: &BodyPart) -> Vec<AttachmentRef> {
    let mut out = Vec::new();
    collect_into(part, &mut out);
    out
}

fn collect_into(part: &BodyPart, out: &mut Vec<AttachmentRef>) {
    if !part.is_multipart() {
        return;
    }
    for child in part.children() {
        if child.is_attachment() {
            out.push(AttachmentRef::from_part(child));
        }
        collect_into(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    struct Upper {
        calls: Cell<usize>,
    }

    impl HtmlRenderer for Upper {
        fn render(&self, html: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(html.to_uppercase())
        }
    }

    fn renderer() -> Upper {
        Upper {
            calls: Cell::new(0),
        }
    }

    fn part(value: serde_json::Value) -> BodyPart {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_leaf_is_verbatim_and_idempotent() {
        let p = part(json!({"id": 1, "content-type": "text/plain", "content": "Hello\n"}));
        let r = renderer();
        let first = render_body(&p, &r).unwrap();
        let second = render_body(&p, &r).unwrap();
        assert_eq!(first, "Hello\n");
        assert_eq!(first, second);
        assert_eq!(r.calls.get(), 0);
    }

    #[test]
    fn test_alternative_prefers_plain() {
        let p = part(json!({
            "id": 1, "content-type": "multipart/alternative", "content": [
                {"id": 2, "content-type": "text/html", "content": "<b>rich</b>"},
                {"id": 3, "content-type": "text/plain", "content": "plain"}
            ]
        }));
        assert_eq!(render_body(&p, &renderer()).unwrap(), "plain");
    }

    #[test]
    fn test_html_only_goes_through_renderer() {
        let p = part(json!({
            "id": 1, "content-type": "multipart/alternative", "content": [
                {"id": 2, "content-type": "text/html", "content": "<b>rich</b>"}
            ]
        }));
        let r = renderer();
        assert_eq!(render_body(&p, &r).unwrap(), "<B>RICH</B>");
        assert_eq!(r.calls.get(), 1);
    }

    #[test]
    fn test_mixed_descends_into_first_child() {
        let p = part(json!({
            "id": 1, "content-type": "multipart/mixed", "content": [
                {"id": 2, "content-type": "multipart/related", "content": [
                    {"id": 3, "content-type": "multipart/alternative", "content": [
                        {"id": 4, "content-type": "text/plain", "content": "deep"}
                    ]},
                    {"id": 5, "content-type": "image/png", "content-disposition": "inline"}
                ]},
                {"id": 6, "content-type": "application/pdf", "content-disposition": "attachment",
                 "filename": "a.pdf", "content-length": 10}
            ]
        }));
        assert_eq!(render_body(&p, &renderer()).unwrap(), "deep");
    }

    #[test]
    fn test_attached_text_is_not_the_body() {
        let p = part(json!({
            "id": 1, "content-type": "multipart/mixed", "content": [
                {"id": 2, "content-type": "multipart/alternative", "content": [
                    {"id": 3, "content-type": "text/plain", "content": "body"}
                ]},
                {"id": 4, "content-type": "text/plain", "content-disposition": "attachment",
                 "filename": "notes.txt", "content": "attached"}
            ]
        }));
        assert_eq!(render_body(&p, &renderer()).unwrap(), "body");
    }

    #[test]
    fn test_empty_multipart_is_fatal() {
        let p = part(json!({"id": 7, "content-type": "multipart/mixed", "content": []}));
        assert!(matches!(
            render_body(&p, &renderer()),
            Err(EpistleError::EmptyBody(7))
        ));
    }

    #[test]
    fn test_unknown_content_type_is_fatal() {
        let p = part(json!({
            "id": 1, "content-type": "multipart/mixed", "content": [
                {"id": 2, "content-type": "application/pdf", "content-disposition": "attachment"}
            ]
        }));
        let err = render_body(&p, &renderer()).unwrap_err();
        assert!(
            matches!(err, EpistleError::UnknownContentType { part: 2, ref content_type } if content_type == "application/pdf")
        );
    }

    #[test]
    fn test_collect_attachments_at_any_depth() {
        let p = part(json!({
            "id": 1, "content-type": "multipart/mixed", "content": [
                {"id": 2, "content-type": "multipart/alternative", "content": [
                    {"id": 3, "content-type": "text/plain", "content": "body"}
                ]},
                {"id": 4, "content-type": "multipart/mixed", "content": [
                    {"id": 5, "content-type": "image/jpeg", "content-disposition": "attachment",
                     "filename": "cat.jpg", "content-length": 5000}
                ]},
                {"id": 6, "content-type": "application/pdf", "content-disposition": "attachment",
                 "content-length": 99}
            ]
        }));
        let atts = collect_attachments(&p);
        assert_eq!(atts.len(), 2);
        assert_eq!(atts[0].part, 5);
        assert_eq!(atts[0].filename, "cat.jpg");
        assert_eq!(atts[0].size, Some(5000));
        assert_eq!(atts[1].filename, "attachment_6");
        assert_eq!(atts[1].content_type, "application/pdf");
    }

    #[test]
    fn test_leaf_never_contributes_attachments() {
        let p = part(json!({
            "id": 1, "content-type": "text/plain", "content-disposition": "attachment", "content": "x"
        }));
        assert!(collect_attachments(&p).is_empty());
    }
}
