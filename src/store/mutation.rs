//! Archive and delete, expressed as file operations on the maildir tree.
//!
//! The synchronizer (mbsync) owns the filenames: it appends its own state
//! after the first comma (`,U=<uid>`) and keeps maildir flags after `:2,`.
//! A mutation is first planned as a list of [`FileOp`]s and then applied in
//! order. The first failing operation aborts the rest; there is no rollback.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{EpistleError, Result};
use crate::model::account::{Folder, Provider, Subdir};
use crate::model::message::Message;

use super::fs::MailFs;

/// Suffix appended to a moved file once the synchronizer state is stripped.
pub const SEEN_MARKER: &str = ",S";

/// Maildir info prefix for version-2 flags.
const INFO_PREFIX: &str = ":2,";

/// What to do with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Archive,
    Delete,
}

impl Mutation {
    pub fn name(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of a planned mutation. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    Remove(PathBuf),
    /// Atomic rename into another folder.
    Move { from: PathBuf, to: PathBuf },
    /// Copy then remove the original (`new` → `cur` within a folder).
    Promote { from: PathBuf, to: PathBuf },
}

/// Plans and applies mutations against a [`MailFs`].
pub struct MutationEngine<'a> {
    fs: &'a dyn MailFs,
}

impl<'a> MutationEngine<'a> {
    pub fn new(fs: &'a dyn MailFs) -> Self {
        Self { fs }
    }

    /// Plan and apply `mutation`, consuming the now-stale message.
    pub fn run(&self, message: Message, mutation: Mutation) -> Result<Vec<FileOp>> {
        let ops = plan(&message, mutation)?;
        info!(
            id = message.id(),
            mutation = %mutation,
            steps = ops.len(),
            "Applying mutation"
        );
        for op in &ops {
            self.apply(op)?;
        }
        Ok(ops)
    }

    fn apply(&self, op: &FileOp) -> Result<()> {
        match op {
            FileOp::Remove(path) => self.fs.remove_file(path),
            FileOp::Move { from, to } => {
                self.refuse_clobber(to)?;
                self.fs.rename(from, to)
            }
            FileOp::Promote { from, to } => {
                self.refuse_clobber(to)?;
                self.fs.copy(from, to)?;
                self.fs.remove_file(from)
            }
        }
    }

    fn refuse_clobber(&self, to: &Path) -> Result<()> {
        if self.fs.exists(to) {
            return Err(EpistleError::io(
                to,
                io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }
        Ok(())
    }
}

/// Work out the file operations for `mutation` without touching the disk.
pub fn plan(message: &Message, mutation: Mutation) -> Result<Vec<FileOp>> {
    let provider = message.provider()?;
    match (provider, mutation) {
        (Provider::Gmail, Mutation::Archive) => plan_gmail_archive(message),
        (Provider::Gmail, Mutation::Delete) => Err(EpistleError::UnsupportedOperation {
            operation: mutation.name(),
            provider: provider.name(),
        }),
        (Provider::Yahoo, Mutation::Archive) => plan_move(message, provider.archive()),
        (Provider::Yahoo, Mutation::Delete) => plan_move(message, provider.trash()),
    }
}

/// Gmail: dropping the INBOX copy removes the label; the all-mail copy stays.
///
/// Copies in other folders still sitting in `new` are promoted to `cur`
/// with the seen flag set.
fn plan_gmail_archive(message: &Message) -> Result<Vec<FileOp>> {
    let inbox = Provider::Gmail.inbox();
    let root = message.location().path();
    let mut ops = Vec::new();

    for (file, mail_path) in message.filenames().iter().zip(message.mail_paths()?) {
        if mail_path.folder == inbox {
            ops.push(FileOp::Remove(file.clone()));
        } else if mail_path.subdir == Subdir::New {
            let to = root
                .join(mail_path.account.as_str())
                .join(mail_path.folder.to_relative_path())
                .join(Subdir::Cur.as_str())
                .join(with_seen_flag(&mail_path.filename));
            ops.push(FileOp::Promote {
                from: file.clone(),
                to,
            });
        }
    }
    Ok(ops)
}

/// Yahoo: move the single file into `target/cur` under a cleaned name.
fn plan_move(message: &Message, target: Folder) -> Result<Vec<FileOp>> {
    let mut paths = message.mail_paths()?;
    if paths.len() != 1 {
        return Err(EpistleError::AmbiguousMutationTarget {
            id: message.id().to_string(),
            count: paths.len(),
        });
    }
    let mail_path = paths.remove(0);
    let from = message.filenames()[0].clone();
    let to = message
        .location()
        .path()
        .join(mail_path.account.as_str())
        .join(target.to_relative_path())
        .join(Subdir::Cur.as_str())
        .join(strip_sync_state(&mail_path.filename));
    Ok(vec![FileOp::Move { from, to }])
}

/// Drop everything from the first comma on and append [`SEEN_MARKER`].
pub fn strip_sync_state(filename: &str) -> String {
    let base = filename.split(',').next().unwrap_or(filename);
    format!("{base}{SEEN_MARKER}")
}

/// Add the maildir `S` flag, keeping the rest of the name intact.
///
/// Flags stay in ASCII order as maildir requires.
pub fn with_seen_flag(filename: &str) -> String {
    match filename.rfind(INFO_PREFIX) {
        Some(pos) => {
            let (base, flags) = filename.split_at(pos + INFO_PREFIX.len());
            if flags.contains('S') {
                return filename.to_string();
            }
            let mut flags: Vec<char> = flags.chars().chain(['S']).collect();
            flags.sort_unstable();
            flags.dedup();
            format!("{base}{}", flags.into_iter().collect::<String>())
        }
        None => format!("{filename}{INFO_PREFIX}S"),
    }
}
