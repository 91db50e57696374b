//! The URI-addressed context filesystem (component C).

pub mod node;
pub mod vikingfs;

pub use vikingfs::{GlobResult, GrepMatch, GrepResult, ListEntry, ListOutput, StatResult, VikingFs};
