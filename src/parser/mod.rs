//! Index output decoding and body flattening.

pub mod body;
pub mod document;
