//! Human-readable rendering of every part, with external filters.

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::error::MimeError;
use crate::mime::filter::{self, FilterTable};
use crate::mime::{Action, Visitor};
use crate::parser::header::{has_type_prefix, mime_type, top_level_type};
use crate::parser::message::{Message, Part};

use super::{settle, summarize, write_text};

/// Renders each part under a `--- N: type size=LEN ---` banner.
///
/// A part with a registered filter is piped through it and its subtree is
/// pruned. Otherwise text is printed (converted to UTF-8), embedded
/// messages show their headers, and other types get a short notice.
pub struct Render<'t, W> {
    out: W,
    filters: &'t FilterTable,
    count: usize,
    error: Option<io::Error>,
}

impl<'t, W: Write> Render<'t, W> {
    pub fn new(out: W, filters: &'t FilterTable) -> Self {
        Self {
            out,
            filters,
            count: 0,
            error: None,
        }
    }

    /// Number of parts rendered so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Hand back the output stream, or the error that stopped the walk.
    pub fn finish(self) -> io::Result<W> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.out),
        }
    }

    fn render(&mut self, depth: usize, part: &Part<'_>, body: &[u8]) -> io::Result<Action> {
        self.count += 1;
        let content_type = part.content_type();
        let summary = summarize(self.count, depth, part, body);

        for _ in 0..=depth {
            write!(self.out, "--- ")?;
        }
        write!(self.out, "{summary}")?;

        // multipart containers always get their children walked
        let filters: &'t FilterTable = self.filters;
        let command = if has_type_prefix(&content_type, "multipart/") {
            None
        } else {
            filters.lookup(mime_type(&content_type), top_level_type(&content_type))
        };

        match command {
            Some(command) => {
                let charset = part.charset();
                if let Some(charset) = &charset {
                    write!(self.out, " charset=\"{charset}\"")?;
                }
                writeln!(self.out, " filter=\"{command}\" ---")?;
                match filter::run(command, charset.as_deref(), body, &mut self.out) {
                    Ok(()) => return Ok(Action::Prune),
                    Err(MimeError::Output(e)) => return Err(e),
                    Err(e) => warn!(part = self.count, error = %e, "Filter failed, rendering part as is"),
                }
            }
            None => writeln!(self.out, " ---")?,
        }

        self.render_default(&content_type, part, body)?;
        Ok(Action::Continue)
    }

    fn render_default(&mut self, content_type: &str, part: &Part<'_>, body: &[u8]) -> io::Result<()> {
        if has_type_prefix(content_type, "text/") {
            write_text(&mut self.out, part.charset().as_deref(), body)
        } else if has_type_prefix(content_type, "message/rfc822") {
            match Message::parse(body) {
                Ok(inner) => {
                    for line in inner.headers() {
                        writeln!(self.out, "{}", line.display())?;
                    }
                    writeln!(self.out)
                }
                Err(e) => {
                    debug!(error = %e, "Embedded message does not parse");
                    Ok(())
                }
            }
        } else if has_type_prefix(content_type, "multipart/") {
            Ok(())
        } else {
            writeln!(self.out, "no filter or default handler")
        }
    }
}

impl<W: Write> Visitor for Render<'_, W> {
    fn visit(&mut self, depth: usize, part: &Part<'_>, body: &[u8]) -> Action {
        let result = self.render(depth, part, body);
        settle(result, &mut self.error)
    }
}
