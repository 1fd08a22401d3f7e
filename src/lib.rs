//! `mimewalk`: display, list, quote and extract the parts of MIME messages.
//!
//! This crate provides the core library: a depth-first walker over a
//! message's MIME tree, the visitors plugged into it, charset conversion
//! of text parts and external filter dispatch.

pub mod config;
pub mod error;
pub mod mime;
pub mod model;
pub mod parser;
pub mod session;
pub mod visitor;
