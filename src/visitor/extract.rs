//! Saving or streaming selected parts.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{MimeError, Result};
use crate::mime::{Action, Visitor};
use crate::parser::message::Part;

use super::settle;

/// One extraction selector: a part number or a literal file name.
///
/// A numeric token is also compared as a file name, so `2` selects part 2
/// as well as a part named `2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    token: String,
    number: Option<usize>,
}

impl Selector {
    pub fn parse(token: &str) -> Self {
        Self {
            token: token.to_string(),
            number: token.parse().ok(),
        }
    }

    pub fn number(&self) -> Option<usize> {
        self.number
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl From<&str> for Selector {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

/// Where extracted parts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractTarget {
    /// Raw bytes to the output stream.
    Console,
    /// New files in this directory; existing files are never overwritten.
    Directory(PathBuf),
}

/// Extracts parts by number or file name.
///
/// Without selectors every part is a candidate: all bodies go to the
/// console, or every part with a file name is saved. With selectors, each
/// matching selector triggers one output action.
pub struct Extract<'s, W> {
    out: W,
    selectors: &'s [Selector],
    target: &'s ExtractTarget,
    count: usize,
    written: Vec<PathBuf>,
    error: Option<io::Error>,
}

impl<'s, W: Write> Extract<'s, W> {
    pub fn new(out: W, selectors: &'s [Selector], target: &'s ExtractTarget) -> Self {
        Self {
            out,
            selectors,
            target,
            count: 0,
            written: Vec::new(),
            error: None,
        }
    }

    pub fn finish(self) -> io::Result<Vec<PathBuf>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.written),
        }
    }

    fn extract(&mut self, part: &Part<'_>, body: &[u8]) -> io::Result<Action> {
        self.count += 1;
        let filename = part.filename();
        let selectors = self.selectors;
        let target = self.target;

        if selectors.is_empty() {
            match (target, &filename) {
                (ExtractTarget::Console, _) => self.out.write_all(body)?,
                (ExtractTarget::Directory(dir), Some(name)) => self.save(dir, name, body)?,
                (ExtractTarget::Directory(_), None) => {}
            }
            return Ok(Action::Continue);
        }

        for selector in selectors {
            if selector.number == Some(self.count) {
                let name = filename
                    .clone()
                    .unwrap_or_else(|| format!("attachment{}", self.count));
                self.emit(&name, body)?;
            } else if filename.as_deref() == Some(selector.token.as_str()) {
                self.emit(selector.token(), body)?;
            }
        }
        Ok(Action::Continue)
    }

    fn emit(&mut self, name: &str, body: &[u8]) -> io::Result<()> {
        let target = self.target;
        match target {
            ExtractTarget::Console => self.out.write_all(body),
            ExtractTarget::Directory(dir) => self.save(dir, name, body),
        }
    }

    /// Announce and write one file. Failures are reported, not fatal.
    fn save(&mut self, dir: &Path, name: &str, body: &[u8]) -> io::Result<()> {
        writeln!(self.out, "{name}")?;
        match write_new_file(dir, name, body) {
            Ok(path) => {
                info!(path = %path.display(), bytes = body.len(), "Extracted part");
                self.written.push(path);
            }
            Err(e) => warn!(part = self.count, error = %e, "Cannot extract part"),
        }
        Ok(())
    }
}

impl<W: Write> Visitor for Extract<'_, W> {
    fn visit(&mut self, _depth: usize, part: &Part<'_>, body: &[u8]) -> Action {
        let result = self.extract(part, body);
        settle(result, &mut self.error)
    }
}

/// Create `dir/<basename of name>` and write `body` to it.
///
/// Fails with [`MimeError::FileExists`] rather than overwriting.
pub fn write_new_file(dir: &Path, name: &str, body: &[u8]) -> Result<PathBuf> {
    let base = Path::new(name)
        .file_name()
        .ok_or_else(|| MimeError::InvalidFilename(name.to_string()))?;
    let path = dir.join(base);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                MimeError::FileExists(path.clone())
            } else {
                MimeError::io(&path, e)
            }
        })?;
    file.write_all(body).map_err(|e| MimeError::io(&path, e))?;
    Ok(path)
}
