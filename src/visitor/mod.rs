//! The strategies plugged into the walker: render, list, reply and extract.
//!
//! Each visitor writes to its own output stream. An error on that stream
//! stops the traversal; the error is kept and handed back by `finish`.

pub mod extract;
pub mod list;
pub mod render;
pub mod reply;

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::error::MimeError;
use crate::mime::recode::{needs_recoding, recode};
use crate::mime::Action;
use crate::model::part::PartSummary;
use crate::parser::header;
use crate::parser::message::Part;

pub use extract::{Extract, ExtractTarget, Selector};
pub use list::{List, ListFormat};
pub use render::Render;
pub use reply::Reply;

/// Write a text body, converting it to UTF-8 when its charset requires it.
fn write_text<W: Write + ?Sized>(out: &mut W, charset: Option<&str>, body: &[u8]) -> io::Result<()> {
    let Some(charset) = charset.filter(|cs| needs_recoding(Some(cs))) else {
        return out.write_all(body);
    };
    match recode(body, charset, out) {
        Ok(()) => Ok(()),
        Err(MimeError::Output(e)) => Err(e),
        Err(e @ MimeError::UnsupportedEncoding(_)) => {
            warn!(charset, "Cannot convert text part");
            writeln!(out, "{e}")
        }
        // partial output stays, the walk goes on
        Err(e) => {
            debug!(error = %e, "Text part converted partially");
            Ok(())
        }
    }
}

/// Summary record for a visited part.
fn summarize(number: usize, depth: usize, part: &Part<'_>, body: &[u8]) -> PartSummary {
    let content_type = part.content_type();
    PartSummary {
        number,
        depth,
        mime_type: header::mime_type(&content_type).to_string(),
        size: body.len() as u64,
        filename: part.filename(),
    }
}

/// Turn an output failure into [`Action::Stop`], keeping the error.
fn settle(result: io::Result<Action>, error: &mut Option<io::Error>) -> Action {
    match result {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, "Output failed, stopping traversal");
            *error = Some(e);
            Action::Stop
        }
    }
}
