//! The index client: location, lock state, queries and mutations.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

use super::port::{id_query, IndexPort, Notmuch};
use crate::config::NotmuchConfig;
use crate::error::{EpistleError, Result};
use crate::model::account::Account;
use crate::model::attachment::{AttachmentContent, AttachmentRef};
use crate::model::body::BodyPart;
use crate::model::location::IndexLocation;
use crate::model::message::Message;
use crate::parser::document::flatten_records;
use crate::store::fs::{LocalFs, MailFs};
use crate::store::mutation::{FileOp, Mutation, MutationEngine};

/// A session against one mail index.
///
/// The location and the account set are fixed at construction. Build a new
/// client to pick up accounts added since.
pub struct IndexClient {
    index: Box<dyn IndexPort>,
    fs: Box<dyn MailFs>,
    location: IndexLocation,
    accounts: BTreeSet<Account>,
    lock_poll_interval: Duration,
}

impl IndexClient {
    /// Connect to the notmuch install described by `config`, on the local filesystem.
    pub fn open(config: &NotmuchConfig) -> Result<Self> {
        Self::with_ports(
            Box::new(Notmuch::new(config.program.clone())),
            Box::new(LocalFs),
            Duration::from_secs(config.lock_poll_interval_secs),
        )
    }

    /// Build a client over arbitrary ports.
    pub fn with_ports(
        index: Box<dyn IndexPort>,
        fs: Box<dyn MailFs>,
        lock_poll_interval: Duration,
    ) -> Result<Self> {
        let location = resolve_location(index.as_ref())?;
        let accounts = scan_accounts(fs.as_ref(), &location)?;
        info!(
            location = %location,
            accounts = accounts.len(),
            "Opened mail index"
        );
        Ok(Self {
            index,
            fs,
            location,
            accounts,
            lock_poll_interval,
        })
    }

    pub fn location(&self) -> &IndexLocation {
        &self.location
    }

    pub fn accounts(&self) -> &BTreeSet<Account> {
        &self.accounts
    }

    /// Whether the index is being written right now. Racy by nature.
    pub fn is_locked(&self) -> bool {
        self.fs.exists(&self.location.lock_marker())
    }

    /// Block until the lock state equals `target`, polling at a fixed interval.
    ///
    /// There is no timeout. `progress`, if given, is called with the elapsed
    /// time before every sleep. Meant for interactive use only.
    pub fn wait_for_lock_state(&self, target: bool, progress: Option<&dyn Fn(Duration)>) {
        let start = Instant::now();
        while self.is_locked() != target {
            debug!(target, elapsed = ?start.elapsed(), "Waiting for index lock state");
            if let Some(report) = progress {
                report(start.elapsed());
            }
            std::thread::sleep(self.lock_poll_interval);
        }
    }

    /// Rescan the mail store so folder state reflects the last sync.
    pub fn refresh(&self) -> Result<()> {
        self.index.refresh()
    }

    /// Unread messages, one record per message.
    pub fn query_unread(&self) -> Result<Messages> {
        self.get_messages("tag:unread", false)
    }

    /// A query matching everything currently in `account`'s inbox.
    pub fn account_inbox_query(&self, account: &Account) -> Result<String> {
        let inbox = account.provider()?.inbox();
        let folder = format!("{account}/{inbox}");
        Ok(format!("folder:\"{}\"", folder.replace('"', "\"\"")))
    }

    /// OR of every known account's inbox predicate.
    pub fn inbox_query(&self) -> Result<String> {
        if self.accounts.is_empty() {
            return Err(EpistleError::NoAccounts(self.location.path().to_path_buf()));
        }
        let terms = self
            .accounts
            .iter()
            .map(|a| self.account_inbox_query(a))
            .collect::<Result<Vec<_>>>()?;
        Ok(terms.join(" OR "))
    }

    /// Whole threads for everything in any inbox.
    pub fn inbox_threads(&self) -> Result<Messages> {
        let query = self.inbox_query()?;
        self.get_messages(&query, true)
    }

    /// Whole threads for everything in one account's inbox.
    pub fn account_threads(&self, account: &Account) -> Result<Messages> {
        let query = self.account_inbox_query(account)?;
        self.get_messages(&query, true)
    }

    /// The whole thread containing message `id`.
    pub fn thread(&self, id: &str) -> Result<Messages> {
        self.get_messages(&id_query(id), true)
    }

    /// Exactly one message by id.
    pub fn find_message(&self, id: &str) -> Result<Message> {
        let mut found = Vec::new();
        for message in self.get_messages(&id_query(id), false)? {
            let message = message?;
            if message.id() == id {
                found.push(message);
            }
        }
        if found.len() != 1 {
            return Err(EpistleError::MessageNotFound(id.to_string()));
        }
        Ok(found.remove(0))
    }

    /// Refresh, run `query`, and decode the output into messages.
    ///
    /// The document shape is checked before this returns; records are turned
    /// into messages as the iterator is consumed.
    pub fn get_messages(&self, query: &str, entire_thread: bool) -> Result<Messages> {
        self.refresh()?;
        debug!(query, entire_thread, "Querying index");
        let doc = self.index.show(query, entire_thread)?;
        let records = flatten_records(doc)?;
        debug!(query, count = records.len(), "Decoded message records");
        Ok(Messages {
            records: records.into_iter(),
            location: self.location.clone(),
        })
    }

    /// Fetch metadata and bytes of one attachment part.
    pub fn fetch_attachment(&self, message: &Message, part: u32) -> Result<AttachmentContent> {
        if message.part(part).is_none() {
            return Err(EpistleError::PartNotFound {
                id: message.id().to_string(),
                part,
            });
        }
        let query = id_query(message.id());
        let meta: BodyPart = serde_json::from_value(self.index.show_part(&query, part)?)?;
        let data = self.index.raw_part(&query, part)?;

        let mut meta = AttachmentRef::from_part(&meta);
        meta.size = meta.size.or(Some(data.len() as u64));
        debug!(id = message.id(), part, bytes = data.len(), "Fetched attachment");
        Ok(AttachmentContent { meta, data })
    }

    /// Archive a message, then refresh the index.
    pub fn archive(&self, message: Message) -> Result<Vec<FileOp>> {
        self.mutate(message, Mutation::Archive)
    }

    /// Delete (move to trash) a message, then refresh the index.
    pub fn delete(&self, message: Message) -> Result<Vec<FileOp>> {
        self.mutate(message, Mutation::Delete)
    }

    fn mutate(&self, message: Message, mutation: Mutation) -> Result<Vec<FileOp>> {
        let ops = MutationEngine::new(self.fs.as_ref()).run(message, mutation)?;
        self.refresh()?;
        Ok(ops)
    }
}

/// Ask the indexer where the mail store lives.
pub fn resolve_location(index: &dyn IndexPort) -> Result<IndexLocation> {
    IndexLocation::new(index.database_path()?)
}

fn scan_accounts(fs: &dyn MailFs, location: &IndexLocation) -> Result<BTreeSet<Account>> {
    Ok(fs
        .list_dir_names(location.path())?
        .into_iter()
        .filter(|name| Account::is_account_dir(name))
        .map(Account::new)
        .collect())
}

/// Messages from one query, produced as they are consumed. Single pass.
pub struct Messages {
    records: std::vec::IntoIter<Value>,
    location: IndexLocation,
}

impl Iterator for Messages {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(Message::from_value(record, self.location.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}
