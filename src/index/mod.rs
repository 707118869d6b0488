//! Access to the notmuch index: the subprocess port and the client on top.

pub mod client;
pub mod port;

pub use client::{IndexClient, Messages};
pub use port::{IndexPort, Notmuch};
