//! The MIME core: tree walker, charset recoding and external filters.

pub mod filter;
pub mod recode;
pub mod walk;

pub use walk::{walk, walk_message, Action, Visitor};
