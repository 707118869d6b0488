//! Export a rendered message as a plain text file.

use std::path::{Path, PathBuf};

use crate::model::message::Message;
use crate::render::HtmlRenderer;

use super::sanitize_filename_part;

/// Write headers, rendered body and an attachment list to `output_dir`.
pub fn export_text(
    message: &Message,
    renderer: &dyn HtmlRenderer,
    output_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let mut content = message.as_text(renderer)?;

    let attachments = message.attachments();
    if !attachments.is_empty() {
        content.push_str(&format!(
            "\n[Attachments: {} file(s)]\n",
            attachments.len()
        ));
        for att in &attachments {
            let size = att
                .size
                .map(|s| humansize::format_size(s, humansize::BINARY))
                .unwrap_or_else(|| "?".to_string());
            content.push_str(&format!(
                "  - [{}] {} ({}, {})\n",
                att.part, att.filename, att.content_type, size
            ));
        }
    }

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(text_filename(message)?);
    std::fs::write(&path, content)?;
    Ok(path)
}

/// `<date>_<subject>.txt`
fn text_filename(message: &Message) -> anyhow::Result<String> {
    let date = message.date()?.format("%Y%m%d_%H%M%S").to_string();
    let subject = sanitize_filename_part(message.subject(), 80);
    Ok(format!("{date}_{subject}.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::model::location::IndexLocation;
    use serde_json::json;

    struct Strip;

    impl HtmlRenderer for Strip {
        fn render(&self, html: &str) -> Result<String> {
            Ok(html.replace("<p>", "").replace("</p>", ""))
        }
    }

    #[test]
    fn test_export_text_with_attachment_list() {
        let tmp = tempfile::tempdir().unwrap();
        let msg = Message::from_value(
            json!({
                "id": "t1", "timestamp": 1700000000,
                "filename": ["/mail/bob@yahoo.com/Inbox/cur/1"],
                "headers": {"Subject": "Q3 report", "From": "boss@corp"},
                "body": [{"id": 1, "content-type": "multipart/mixed", "content": [
                    {"id": 2, "content-type": "text/html", "content": "<p>See attached</p>"},
                    {"id": 3, "content-type": "application/pdf", "content-disposition": "attachment",
                     "filename": "q3.pdf", "content-length": 2048}
                ]}]
            }),
            IndexLocation::new("/mail").unwrap(),
        )
        .unwrap();

        let path = export_text(&msg, &Strip, tmp.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.ends_with("_Q3_report.txt"), "got {name}");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Subject: Q3 report\nFrom: boss@corp\n\nSee attached"));
        assert!(text.contains("[3] q3.pdf (application/pdf, 2 KiB)"));
    }
}
