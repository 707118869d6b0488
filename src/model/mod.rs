//! Core data model: accounts, folders, message records and body trees.

pub mod account;
pub mod attachment;
pub mod body;
pub mod location;
pub mod message;
