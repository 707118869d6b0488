//! Centralized error types for epistle.
//!
//! Every variant is fatal to the operation that raised it. Nothing in the
//! library retries; callers report and abort.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the epistle library.
#[derive(Error, Debug)]
pub enum EpistleError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An external program could not be started at all.
    #[error("External program '{program}' not found or not executable: {source}")]
    ToolNotFound {
        program: String,
        source: std::io::Error,
    },

    /// An external program ran but exited unsuccessfully.
    #[error("External program '{program}' failed ({status}): {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The index configuration returned something that is not a usable store root.
    #[error("Invalid index location: {0}")]
    InvalidLocation(String),

    /// The index output had a shape outside its contract.
    #[error("Malformed index document: {0}")]
    MalformedDocument(String),

    /// An object node could not be read as a message record.
    #[error("Malformed message record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    /// A message file path does not follow `<account>/<folder...>/<cur|new>/<file>`.
    #[error("Malformed mail file path: {0}")]
    MalformedPath(PathBuf),

    /// A message file lies outside the index location.
    #[error("Mail file '{path}' is outside the mail store '{root}'")]
    PathOutsideStore { path: PathBuf, root: PathBuf },

    /// A multipart body had no children to render.
    #[error("Empty body in part {0}")]
    EmptyBody(u32),

    /// A body part has a content type the renderer does not know.
    #[error("Unknown content type '{content_type}' in part {part}")]
    UnknownContentType { part: u32, content_type: String },

    /// An account identifier matches no known provider.
    #[error("Unknown provider for account '{0}'")]
    UnknownProvider(String),

    /// A message's files belong to more than one account.
    #[error("Message {id} spans multiple accounts: {accounts:?}")]
    MultiAccountMessage { id: String, accounts: Vec<String> },

    /// A message is in the trash folder and some other folder at once.
    #[error("Message {id} is in trash and other folders: {folders:?}")]
    TrashConflict { id: String, folders: Vec<String> },

    /// A move needs exactly one source file.
    #[error("Message {id} has {count} files; cannot pick a mutation target")]
    AmbiguousMutationTarget { id: String, count: usize },

    /// The provider has no rule for this mutation.
    #[error("Operation '{operation}' is not supported for {provider} accounts")]
    UnsupportedOperation {
        operation: &'static str,
        provider: &'static str,
    },

    /// No account directories were found under the index location.
    #[error("No accounts found under '{0}'")]
    NoAccounts(PathBuf),

    /// A lookup by message id matched nothing (or more than one record).
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// A requested body part does not exist.
    #[error("Part {part} not found in message {id}")]
    PartNotFound { id: String, part: u32 },
}

/// Convenience alias for `Result<T, EpistleError>`.
pub type Result<T> = std::result::Result<T, EpistleError>;

impl EpistleError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
