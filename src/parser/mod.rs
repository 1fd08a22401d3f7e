//! Message access: parsed message handles, part views and header helpers.

pub mod header;
pub mod message;
pub mod transfer;
