//! Message records decoded from the index, and the entity wrapping them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::account::{Account, Folder, MailPath, Provider};
use super::attachment::AttachmentRef;
use super::body::BodyPart;
use super::location::IndexLocation;
use crate::error::{EpistleError, Result};
use crate::parser::body::{collect_attachments, render_body};
use crate::render::HtmlRenderer;

/// Format of the timestamp column in [`Message::display_line`].
pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One message object from `notmuch show --format=json`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRecord {
    pub id: String,

    /// Seconds since the epoch, as the index reports it.
    pub timestamp: i64,

    /// Every file the index holds for this message.
    #[serde(rename = "filename", deserialize_with = "one_or_many")]
    pub filenames: Vec<PathBuf>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Headers in the order the index emitted them.
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    #[serde(default)]
    pub body: Vec<BodyPart>,
}

/// Older notmuch releases emit a single string instead of a list.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

/// A message as of the query that produced it.
///
/// Everything derived here is recomputed on each call; nothing is cached.
/// The value is stale once its files are archived or deleted; those
/// operations consume it.
#[derive(Debug, Clone)]
pub struct Message {
    record: MessageRecord,
    location: IndexLocation,
}

impl Message {
    pub fn new(record: MessageRecord, location: IndexLocation) -> Self {
        Self { record, location }
    }

    /// Typed extraction of one flattened record.
    pub fn from_value(value: Value, location: IndexLocation) -> Result<Self> {
        let record: MessageRecord = serde_json::from_value(value)?;
        Ok(Self::new(record, location))
    }

    pub fn location(&self) -> &IndexLocation {
        &self.location
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or("")
    }

    pub fn sender(&self) -> &str {
        self.header("From").unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.record.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.record.headers
    }

    pub fn tags(&self) -> &[String] {
        &self.record.tags
    }

    pub fn is_unread(&self) -> bool {
        self.record.tags.iter().any(|t| t == "unread")
    }

    pub fn timestamp(&self) -> i64 {
        self.record.timestamp
    }

    /// The index timestamp in local time.
    pub fn date(&self) -> Result<DateTime<Local>> {
        DateTime::from_timestamp(self.record.timestamp, 0)
            .map(|utc| utc.with_timezone(&Local))
            .ok_or_else(|| {
                EpistleError::MalformedDocument(format!(
                    "timestamp {} of message {} is out of range",
                    self.record.timestamp, self.record.id
                ))
            })
    }

    /// Absolute file paths as reported by the index.
    pub fn filenames(&self) -> &[PathBuf] {
        &self.record.filenames
    }

    /// File paths relative to the index location, split into their parts.
    pub fn mail_paths(&self) -> Result<Vec<MailPath>> {
        self.record
            .filenames
            .iter()
            .map(|f| MailPath::parse(self.location.relativize(f)?))
            .collect()
    }

    /// The single account every file of this message belongs to.
    pub fn account(&self) -> Result<Account> {
        let accounts: BTreeSet<Account> =
            self.mail_paths()?.into_iter().map(|p| p.account).collect();
        let mut iter = accounts.iter();
        match (iter.next(), iter.next()) {
            (Some(account), None) => Ok(account.clone()),
            (None, _) => Err(EpistleError::MalformedDocument(format!(
                "message {} has no files",
                self.record.id
            ))),
            (Some(_), Some(_)) => Err(EpistleError::MultiAccountMessage {
                id: self.record.id.clone(),
                accounts: accounts.iter().map(Account::to_string).collect(),
            }),
        }
    }

    pub fn provider(&self) -> Result<Provider> {
        self.account()?.provider()
    }

    /// Distinct folders holding a copy of this message.
    pub fn folders(&self) -> Result<BTreeSet<Folder>> {
        Ok(self.mail_paths()?.into_iter().map(|p| p.folder).collect())
    }

    /// Folders worth showing: Gmail's all-mail mirror is dropped once the
    /// message is known to be somewhere more specific.
    pub fn friendly_folders(&self) -> Result<BTreeSet<Folder>> {
        let mut folders = self.folders()?;
        if folders.len() > 1 {
            if let Some(all_mail) = self.provider()?.all_mail() {
                folders.remove(&all_mail);
            }
        }
        Ok(folders)
    }

    /// Whether the message sits in its provider's trash.
    ///
    /// Trash is terminal: a message in trash and anywhere else is an error.
    pub fn in_trash(&self) -> Result<bool> {
        let trash = self.provider()?.trash();
        let folders = self.folders()?;
        if !folders.contains(&trash) {
            return Ok(false);
        }
        if folders.len() > 1 {
            return Err(EpistleError::TrashConflict {
                id: self.record.id.clone(),
                folders: folders.iter().map(Folder::to_string).collect(),
            });
        }
        Ok(true)
    }

    /// `<date> ><account> <folders> <<from> <subject>` on one line.
    pub fn display_line(&self) -> Result<String> {
        let folders = self
            .friendly_folders()?
            .iter()
            .map(Folder::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "{} >{} {} <{} {}",
            self.date()?.format(DISPLAY_DATE_FORMAT),
            self.account()?,
            folders,
            self.sender(),
            self.subject()
        ))
    }

    /// Rendered text of the whole body.
    pub fn body_text(&self, renderer: &dyn HtmlRenderer) -> Result<String> {
        if self.record.body.is_empty() {
            return Err(EpistleError::EmptyBody(0));
        }
        let parts = self
            .record
            .body
            .iter()
            .map(|part| render_body(part, renderer))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("\n"))
    }

    /// Header block followed by the rendered body.
    pub fn as_text(&self, renderer: &dyn HtmlRenderer) -> Result<String> {
        let mut text = String::new();
        for (name, value) in &self.record.headers {
            text.push_str(name);
            text.push_str(": ");
            text.push_str(value);
            text.push('\n');
        }
        text.push('\n');
        text.push_str(&self.body_text(renderer)?);
        Ok(text)
    }

    pub fn attachments(&self) -> Vec<AttachmentRef> {
        self.record.body.iter().flat_map(collect_attachments).collect()
    }

    /// Look up a body part by its index-assigned id.
    pub fn part(&self, id: u32) -> Option<&BodyPart> {
        self.record.body.iter().find_map(|p| p.find(id))
    }
}
