//! Per-message orchestration: open, show headers, walk the body.
//!
//! A [`Session`] lives for one run. It owns the output stream and the
//! filter table; every per-message counter lives in the visitor created
//! for that message, so each message starts numbering its parts at 1.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MimeError, Result};
use crate::mime::filter::FilterTable;
use crate::mime::walk_message;
use crate::model::part::PartSummary;
use crate::parser::header::display_line;
use crate::parser::message::{Message, MessageSource};
use crate::visitor::{Extract, ExtractTarget, List, ListFormat, Render, Reply, Selector};

/// Headers shown by default, in this order.
pub const DEFAULT_HEADERS: &str = "from:subject:to:cc:date:";

/// Line separating consecutive messages in show mode.
const PAGE_BREAK: &[u8] = b"\x0c\n";

/// Which headers `show` prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMode {
    /// The header block byte for byte.
    Raw,
    /// Every header, decoded.
    All,
    /// The named headers that are present, decoded, in list order.
    Selected(Vec<String>),
}

impl HeaderMode {
    /// Build a selection from a colon-separated list such as `from:subject:`.
    pub fn selected(list: &str) -> Self {
        Self::Selected(
            list.split(':')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

impl Default for HeaderMode {
    fn default() -> Self {
        Self::selected(DEFAULT_HEADERS)
    }
}

/// What `show` does with the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyMode {
    /// Headers only.
    Skip,
    /// The body as it appears in the source.
    Raw,
    /// Walk the MIME tree and render each part.
    #[default]
    Mime,
}

/// Options for [`Session::show`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowOptions {
    pub headers: HeaderMode,
    pub body: BodyMode,
    /// Pipe parts through the filter table.
    pub filters: bool,
    /// Separate messages with a form feed line.
    pub page_break: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            headers: HeaderMode::default(),
            body: BodyMode::default(),
            filters: true,
            page_break: true,
        }
    }
}

/// Shows, lists, quotes and extracts messages onto one output stream.
pub struct Session<W> {
    out: W,
    filters: FilterTable,
    shown: usize,
}

impl<W: Write> Session<W> {
    pub fn new(out: W, filters: FilterTable) -> Self {
        Self {
            out,
            filters,
            shown: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Display one message file.
    pub fn show(&mut self, path: &Path, options: &ShowOptions) -> Result<()> {
        if self.shown > 0 && options.page_break {
            self.out.write_all(PAGE_BREAK)?;
        }
        self.shown += 1;

        let source = MessageSource::open(path)?;
        let message = source.parse()?;
        self.show_message(&message, options)
    }

    /// Display an already parsed message.
    pub fn show_message(&mut self, message: &Message<'_>, options: &ShowOptions) -> Result<()> {
        self.write_headers(message, &options.headers)?;
        if options.body == BodyMode::Skip {
            return Ok(());
        }
        writeln!(self.out)?;

        if options.body == BodyMode::Raw || !message.is_mime() {
            debug!(forced = options.body == BodyMode::Raw, "Showing raw body");
            self.out.write_all(message.raw_body())?;
            return Ok(());
        }

        let no_filters = FilterTable::new();
        let filters = if options.filters {
            &self.filters
        } else {
            &no_filters
        };
        let mut render = Render::new(&mut self.out, filters);
        walk_message(message, &mut render);
        render.finish()?;
        Ok(())
    }

    fn write_headers(&mut self, message: &Message<'_>, mode: &HeaderMode) -> Result<()> {
        match mode {
            HeaderMode::Raw => self.out.write_all(message.raw_headers())?,
            HeaderMode::All => {
                for line in message.headers() {
                    writeln!(self.out, "{}", line.display())?;
                }
            }
            HeaderMode::Selected(names) => {
                for name in names {
                    if let Some(value) = message.header_decoded(name) {
                        writeln!(self.out, "{}", display_line(name, &value))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Print the part tree of one message file.
    pub fn list(&mut self, path: &Path, format: ListFormat) -> Result<Vec<PartSummary>> {
        let source = MessageSource::open(path)?;
        let message = source.parse()?;

        if format == ListFormat::Text {
            writeln!(self.out, "{}", path.display())?;
        }
        let mut list = List::new(&mut self.out, format);
        walk_message(&message, &mut list);
        let parts = list.finish()?;

        if format == ListFormat::Json {
            let report = serde_json::json!({
                "file": path.to_string_lossy(),
                "parts": parts,
            });
            serde_json::to_writer_pretty(&mut self.out, &report)
                .map_err(|e| MimeError::Output(e.into()))?;
            writeln!(self.out)?;
        }
        Ok(parts)
    }

    /// Print the plain-text parts of one message file, for quoting.
    pub fn reply(&mut self, path: &Path) -> Result<()> {
        let source = MessageSource::open(path)?;
        let message = source.parse()?;
        let mut reply = Reply::new(&mut self.out);
        walk_message(&message, &mut reply);
        reply.finish()?;
        Ok(())
    }

    /// Extract the selected parts of one message file.
    ///
    /// Returns the files created; parts that could not be saved are
    /// reported and skipped.
    pub fn extract(
        &mut self,
        path: &Path,
        selectors: &[Selector],
        target: &ExtractTarget,
    ) -> Result<Vec<PathBuf>> {
        let source = MessageSource::open(path)?;
        let message = source.parse()?;
        let mut extract = Extract::new(&mut self.out, selectors, target);
        walk_message(&message, &mut extract);
        Ok(extract.finish()?)
    }
}
