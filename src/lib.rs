//! `epistle`: a terminal front end over a notmuch mail index.
//!
//! This crate provides the core library for querying the index, classifying
//! messages by account and folder, rendering bodies to text, and archiving
//! or deleting messages in an mbsync-managed maildir tree.

pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod model;
pub mod parser;
pub mod process;
pub mod render;
pub mod store;
