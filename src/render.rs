//! HTML-to-text rendering through an external program.

use tracing::debug;

use crate::error::{EpistleError, Result};
use crate::process;

/// Converts an HTML body part to plain text.
pub trait HtmlRenderer {
    fn render(&self, html: &str) -> Result<String>;
}

/// Renders HTML by piping it through a command such as `w3m -T text/html -dump`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full command line, program first.
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| EpistleError::ToolFailed {
            program: String::new(),
            status: "not run".to_string(),
            stderr: "empty HTML renderer command".to_string(),
        })?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl HtmlRenderer for CommandRenderer {
    fn render(&self, html: &str) -> Result<String> {
        debug!(program = %self.program, bytes = html.len(), "Rendering HTML part");
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let out = process::run(&self.program, &args, Some(html.as_bytes()))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
