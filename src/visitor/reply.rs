//! Plain-text extraction for quoting in a reply.

use std::io::{self, Write};

use crate::mime::{Action, Visitor};
use crate::parser::header::has_type_prefix;
use crate::parser::message::Part;

use super::{settle, write_text};

/// Writes the body of every `text/plain` part (and of parts without a
/// content type), converted to UTF-8. Everything else is skipped, but
/// containers are still descended into.
pub struct Reply<W> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> Reply<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn finish(self) -> io::Result<W> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.out),
        }
    }

    fn quote(&mut self, part: &Part<'_>, body: &[u8]) -> io::Result<Action> {
        let is_plain = part
            .declared_content_type()
            .is_none_or(|ct| has_type_prefix(&ct, "text/plain"));
        if is_plain {
            write_text(&mut self.out, part.charset().as_deref(), body)?;
        }
        Ok(Action::Continue)
    }
}

impl<W: Write> Visitor for Reply<W> {
    fn visit(&mut self, _depth: usize, part: &Part<'_>, body: &[u8]) -> Action {
        let result = self.quote(part, body);
        settle(result, &mut self.error)
    }
}
