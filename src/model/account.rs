//! Account and folder classification for mbsync-style maildir trees.
//!
//! A mail file lives at `<account>/<folder...>/<cur|new>/<filename>` relative
//! to the index location. The account segment decides the provider, and the
//! provider decides which folders mean inbox, trash and archive.

use std::fmt;
use std::path::{Component, Path};

use crate::error::{EpistleError, Result};

/// Mail provider conventions known to epistle.
///
/// Adding a provider means filling in every `match` below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Gmail: labels are folders, `[Gmail]/All Mail` holds every message.
    Gmail,
    /// Yahoo: plain IMAP folders, explicit `Archive` and `Trash`.
    Yahoo,
}

impl Provider {
    /// Classify an account identifier. Unknown patterns are an error.
    pub fn classify(account: &str) -> Result<Self> {
        if account.ends_with("@gmail.com") {
            Ok(Self::Gmail)
        } else if account.contains("@yahoo") {
            Ok(Self::Yahoo)
        } else {
            Err(EpistleError::UnknownProvider(account.to_string()))
        }
    }

    /// Short lowercase name, used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Yahoo => "yahoo",
        }
    }

    pub fn inbox(self) -> Folder {
        match self {
            Self::Gmail => Folder::new(["INBOX"]),
            Self::Yahoo => Folder::new(["Inbox"]),
        }
    }

    pub fn trash(self) -> Folder {
        match self {
            Self::Gmail => Folder::new(["[Gmail]", "Trash"]),
            Self::Yahoo => Folder::new(["Trash"]),
        }
    }

    /// Where archived mail ends up. For Gmail that is the all-mail folder.
    pub fn archive(self) -> Folder {
        match self {
            Self::Gmail => Folder::new(["[Gmail]", "All Mail"]),
            Self::Yahoo => Folder::new(["Archive"]),
        }
    }

    /// The synthetic folder that mirrors every message, if the provider has one.
    pub fn all_mail(self) -> Option<Folder> {
        match self {
            Self::Gmail => Some(Folder::new(["[Gmail]", "All Mail"])),
            Self::Yahoo => None,
        }
    }

    pub fn is_inbox(self, folder: &Folder) -> bool {
        *folder == self.inbox()
    }

    pub fn is_trash(self, folder: &Folder) -> bool {
        *folder == self.trash()
    }

    pub fn is_archive(self, folder: &Folder) -> bool {
        *folder == self.archive()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An account directory name, i.e. an email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Account(String);

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn provider(&self) -> Result<Provider> {
        Provider::classify(&self.0)
    }

    /// Whether a directory name under the index location looks like an account.
    pub fn is_account_dir(name: &str) -> bool {
        name.contains('@')
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A folder path below an account, e.g. `["[Gmail]", "Trash"]`.
///
/// The empty folder is the account's root maildir.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Folder(Vec<String>);

impl Folder {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Filesystem path of the folder relative to its account directory.
    pub fn to_relative_path(&self) -> std::path::PathBuf {
        self.0.iter().collect()
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Maildir delivery subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdir {
    Cur,
    New,
}

impl Subdir {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cur => "cur",
            Self::New => "new",
        }
    }
}

/// A mail file path relative to the index location, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailPath {
    pub account: Account,
    pub folder: Folder,
    pub subdir: Subdir,
    pub filename: String,
}

impl MailPath {
    /// Split `<account>/<folder...>/<cur|new>/<filename>`.
    pub fn parse(relative: &Path) -> Result<Self> {
        let malformed = || EpistleError::MalformedPath(relative.to_path_buf());

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    parts.push(part.to_str().ok_or_else(malformed)?.to_string())
                }
                _ => return Err(malformed()),
            }
        }
        if parts.len() < 3 {
            return Err(malformed());
        }

        let filename = parts.pop().ok_or_else(malformed)?;
        let subdir = match parts.pop().as_deref() {
            Some("cur") => Subdir::Cur,
            Some("new") => Subdir::New,
            _ => return Err(malformed()),
        };
        let account = Account::new(parts.remove(0));

        Ok(Self {
            account,
            folder: Folder(parts),
            subdir,
            filename,
        })
    }
}
