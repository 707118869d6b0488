//! Save fetched attachments to disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::model::attachment::AttachmentContent;

use super::sanitize_filename_part;

/// Write an attachment into `output_dir` under its own (sanitized) name.
///
/// Existing files are never overwritten; a counter is appended instead.
pub fn save_attachment(content: &AttachmentContent, output_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let filename = sanitize_filename_part(&content.meta.filename, 150);
    let path = unique_path(&output_dir.join(filename));
    std::fs::write(&path, &content.data)?;
    info!(
        path = %path.display(),
        bytes = content.data.len(),
        "Saved attachment"
    );
    Ok(path)
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    let numbered = |suffix: &str| {
        if ext.is_empty() {
            parent.join(format!("{stem}_{suffix}"))
        } else {
            parent.join(format!("{stem}_{suffix}.{ext}"))
        }
    };

    for i in 1..1000 {
        let candidate = numbered(&i.to_string());
        if !candidate.exists() {
            return candidate;
        }
    }

    numbered("dup")
}
