//! Compact listing of a message's part tree.

use std::io::{self, Write};

use crate::mime::{Action, Visitor};
use crate::model::part::PartSummary;
use crate::parser::message::Part;

use super::{settle, summarize};

/// How [`List`] reports parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// One indented line per part, written as the walk goes.
    #[default]
    Text,
    /// Collect [`PartSummary`] records for the caller to serialize.
    Json,
}

/// Lists every part: number, type, size and file name. Never writes bodies.
pub struct List<W> {
    out: W,
    format: ListFormat,
    parts: Vec<PartSummary>,
    error: Option<io::Error>,
}

impl<W: Write> List<W> {
    pub fn new(out: W, format: ListFormat) -> Self {
        Self {
            out,
            format,
            parts: Vec::new(),
            error: None,
        }
    }

    /// Summaries of the parts seen, in walk order.
    pub fn finish(self) -> io::Result<Vec<PartSummary>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.parts),
        }
    }

    fn list(&mut self, depth: usize, part: &Part<'_>, body: &[u8]) -> io::Result<Action> {
        let summary = summarize(self.parts.len() + 1, depth, part, body);
        if self.format == ListFormat::Text {
            writeln!(self.out, "  {:indent$}{summary}", "", indent = depth * 2)?;
        }
        self.parts.push(summary);
        Ok(Action::Continue)
    }
}

impl<W: Write> Visitor for List<W> {
    fn visit(&mut self, depth: usize, part: &Part<'_>, body: &[u8]) -> Action {
        let result = self.list(depth, part, body);
        settle(result, &mut self.error)
    }
}
