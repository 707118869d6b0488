//! Synchronous invocation of external programs.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{EpistleError, Result};

/// Run `program args...`, optionally feeding `stdin`, and return stdout.
///
/// A program that cannot be spawned is `ToolNotFound`; a non-zero exit is
/// `ToolFailed` with the trimmed stderr.
pub fn run(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
    debug!(program, ?args, "Running external program");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EpistleError::ToolNotFound {
            program: program.to_string(),
            source,
        })?;

    // stdin is fed from its own thread while stdout is drained here.
    let output = std::thread::scope(|scope| {
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            scope.spawn(move || {
                if let Err(e) = pipe.write_all(input) {
                    debug!(program, error = %e, "Child closed stdin early");
                }
            });
        }
        child.wait_with_output()
    })
    .map_err(|e| EpistleError::io(program, e))?;

    if !output.status.success() {
        return Err(EpistleError::ToolFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let out = run("sh", &["-c", "printf hello"], None).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_run_feeds_stdin() {
        let out = run("cat", &[], Some(b"piped")).unwrap();
        assert_eq!(out, b"piped");
    }

    #[test]
    fn test_nonzero_exit_is_tool_failed() {
        let err = run("sh", &["-c", "echo boom >&2; exit 3"], None).unwrap_err();
        match err {
            EpistleError::ToolFailed { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_tool_not_found() {
        let err = run("epistle-no-such-program", &[], None).unwrap_err();
        assert!(matches!(err, EpistleError::ToolNotFound { .. }));
    }
}
