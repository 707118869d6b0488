//! Mail store access: the filesystem port and archive/delete mutations.

pub mod fs;
pub mod mutation;
