//! Depth-first traversal of a message's MIME tree.

use tracing::debug;

use crate::parser::header::has_type_prefix;
use crate::parser::message::{Message, Part};

/// What the walker does after visiting a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Descend into the part's children, if any.
    Continue,
    /// Abandon the whole traversal.
    Stop,
    /// Skip the part's children but keep going with its siblings.
    Prune,
}

/// Called once per part, in pre-order.
pub trait Visitor {
    fn visit(&mut self, depth: usize, part: &Part<'_>, body: &[u8]) -> Action;
}

/// Walk `part` and everything below it.
///
/// Parts whose body cannot be decoded are skipped without a visit. The
/// visitor's [`Action`] decides whether multipart children and embedded
/// `message/rfc822` messages are descended into. A [`Action::Stop`] from
/// any depth is returned from every level without visiting anything else.
pub fn walk<V: Visitor + ?Sized>(part: &Part<'_>, depth: usize, visitor: &mut V) -> Action {
    let Some(body) = part.body() else {
        debug!(depth, "Skipping part without a usable body");
        return Action::Continue;
    };
    let content_type = part.content_type();

    let action = visitor.visit(depth, part, &body);
    if action != Action::Continue {
        return action;
    }

    if has_type_prefix(&content_type, "multipart/") {
        for child in part.children() {
            if walk(&child, depth + 1, visitor) == Action::Stop {
                return Action::Stop;
            }
        }
    } else if has_type_prefix(&content_type, "message/rfc822") {
        match Message::parse(&body) {
            Ok(inner) => {
                if walk(&inner.root(), depth + 1, visitor) == Action::Stop {
                    return Action::Stop;
                }
            }
            Err(e) => debug!(depth, error = %e, "Embedded message does not parse"),
        }
    }

    Action::Continue
}

/// Walk a whole message from its top-level body.
pub fn walk_message<V: Visitor + ?Sized>(message: &Message<'_>, visitor: &mut V) -> Action {
    walk(&message.root(), 0, visitor)
}
