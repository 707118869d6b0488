//! The index-query port and its notmuch implementation.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{EpistleError, Result};
use crate::process;

/// What epistle needs from a mail indexer.
pub trait IndexPort {
    /// Absolute path of the mail store root.
    fn database_path(&self) -> Result<PathBuf>;

    /// Incremental rescan of the mail store.
    fn refresh(&self) -> Result<()>;

    /// Structured query output, bodies and HTML included.
    fn show(&self, query: &str, entire_thread: bool) -> Result<Value>;

    /// JSON metadata of a single body part.
    fn show_part(&self, query: &str, part: u32) -> Result<Value>;

    /// Decoded bytes of a single body part.
    fn raw_part(&self, query: &str, part: u32) -> Result<Vec<u8>>;
}

/// Build an exact-match query for a message id.
pub fn id_query(id: &str) -> String {
    format!("id:\"{}\"", id.replace('"', "\"\""))
}

/// Runs the `notmuch` command-line tool.
#[derive(Debug, Clone)]
pub struct Notmuch {
    program: String,
}

impl Default for Notmuch {
    fn default() -> Self {
        Self::new("notmuch")
    }
}

impl Notmuch {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        process::run(&self.program, args, None)
    }

    fn run_json(&self, args: &[&str]) -> Result<Value> {
        parse_document(&self.run(args)?)
    }
}

/// Parse query output with no nesting limit; reply chains nest two levels per reply.
pub fn parse_document(bytes: &[u8]) -> Result<Value> {
    let malformed = |e: serde_json::Error| {
        EpistleError::MalformedDocument(format!("invalid JSON from notmuch: {e}"))
    };
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();
    let doc = Value::deserialize(&mut de).map_err(malformed)?;
    de.end().map_err(malformed)?;
    Ok(doc)
}

impl IndexPort for Notmuch {
    fn database_path(&self) -> Result<PathBuf> {
        let out = self.run(&["config", "get", "database.path"])?;
        let path = String::from_utf8_lossy(&out).trim().to_string();
        if path.is_empty() {
            return Err(EpistleError::InvalidLocation(
                "notmuch database.path is not set".to_string(),
            ));
        }
        Ok(PathBuf::from(path))
    }

    fn refresh(&self) -> Result<()> {
        info!(program = %self.program, "Refreshing index");
        self.run(&["new", "--quiet"])?;
        Ok(())
    }

    fn show(&self, query: &str, entire_thread: bool) -> Result<Value> {
        let entire = if entire_thread {
            "--entire-thread=true"
        } else {
            "--entire-thread=false"
        };
        self.run_json(&[
            "show",
            "--format=json",
            entire,
            "--body=true",
            "--include-html",
            "--",
            query,
        ])
    }

    fn show_part(&self, query: &str, part: u32) -> Result<Value> {
        let part = format!("--part={part}");
        self.run_json(&["show", "--format=json", &part, "--", query])
    }

    fn raw_part(&self, query: &str, part: u32) -> Result<Vec<u8>> {
        let part = format!("--part={part}");
        self.run(&["show", "--format=raw", &part, "--", query])
    }
}
