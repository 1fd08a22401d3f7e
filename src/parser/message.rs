//! Parsed message handles and the part view the walker operates on.
//!
//! Structure (headers, multipart boundaries, transfer encodings) comes from
//! `mailparse`; everything here is a borrowed view over the message bytes.

use std::path::{Path, PathBuf};

use mailparse::body::Body;
use mailparse::{MailHeader, ParsedMail};
use tracing::debug;

use crate::error::{MimeError, Result};
use crate::parser::header::{self, UNKNOWN_CONTENT_TYPE};
use crate::parser::transfer;

/// The raw bytes of one message, read from a file.
#[derive(Debug)]
pub struct MessageSource {
    path: PathBuf,
    data: Vec<u8>,
}

impl MessageSource {
    /// Read a message file into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MimeError::NotFound(path.to_path_buf())
            } else {
                MimeError::io(path, e)
            }
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Parse the message. The result borrows from `self`.
    pub fn parse(&self) -> Result<Message<'_>> {
        Message::parse(&self.data).map_err(|e| match e {
            MimeError::Parse { reason, .. } => MimeError::Parse {
                path: self.path.clone(),
                reason,
            },
            other => other,
        })
    }
}

/// A parsed message: header list plus top-level body.
pub struct Message<'a> {
    mail: ParsedMail<'a>,
}

impl<'a> Message<'a> {
    /// Parse a message held in memory (used for `message/rfc822` bodies too).
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mail = mailparse::parse_mail(bytes).map_err(|e| MimeError::Parse {
            path: PathBuf::from("<memory>"),
            reason: e.to_string(),
        })?;
        Ok(Self { mail })
    }

    /// The top-level body of the message.
    pub fn root(&self) -> Part<'_> {
        Part::new(&self.mail, false)
    }

    /// First header named `name`, unfolded but not decoded.
    pub fn header(&self, name: &str) -> Option<String> {
        self.root().header(name)
    }

    /// First header named `name`, unfolded with encoded-words decoded.
    pub fn header_decoded(&self, name: &str) -> Option<String> {
        self.root().header_decoded(name)
    }

    /// All headers in wire order. Every call starts from the first header.
    pub fn headers(&self) -> impl Iterator<Item = HeaderLine> + '_ {
        self.root().headers()
    }

    /// The header section exactly as it appears in the source, including
    /// the final line break but not the blank separator line.
    pub fn raw_headers(&self) -> &'a [u8] {
        split_at_header_end(self.mail.raw_bytes).0
    }

    /// The body exactly as it appears in the source.
    pub fn raw_body(&self) -> &'a [u8] {
        split_at_header_end(self.mail.raw_bytes).1
    }

    /// Whether the message declares `MIME-Version: 1.0`.
    ///
    /// Messages without it are shown raw rather than walked.
    pub fn is_mime(&self) -> bool {
        self.header("mime-version").is_some_and(|v| {
            let v = v.trim_start();
            v.strip_prefix("1.0")
                .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t', '(']))
        })
    }
}

/// One header line: name as written, unfolded raw value and the value
/// with RFC 2047 encoded-words decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    pub name: String,
    pub value: String,
    pub decoded: String,
}

impl HeaderLine {
    fn new(h: &MailHeader<'_>) -> Self {
        Self {
            name: h.get_key(),
            value: header::unfold_value(h.get_value_raw()),
            decoded: h.get_value(),
        }
    }

    /// `Name: value` with encoded-words decoded, for display.
    pub fn display(&self) -> String {
        header::display_line(&self.name, &self.decoded)
    }
}

impl std::fmt::Display for HeaderLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// A node of the MIME tree: its own headers, body and children.
#[derive(Clone, Copy)]
pub struct Part<'p> {
    mail: &'p ParsedMail<'p>,
    /// Set for children of a multipart, whose raw body still ends with
    /// the line break of the next boundary delimiter.
    in_multipart: bool,
}

impl<'p> Part<'p> {
    fn new(mail: &'p ParsedMail<'p>, in_multipart: bool) -> Self {
        Self { mail, in_multipart }
    }

    fn find_header(&self, name: &str) -> Option<&'p MailHeader<'p>> {
        self.mail
            .headers
            .iter()
            .find(|h| h.get_key().eq_ignore_ascii_case(name))
    }

    /// First header named `name` (case-insensitive), unfolded.
    pub fn header(&self, name: &str) -> Option<String> {
        self.find_header(name)
            .map(|h| header::unfold_value(h.get_value_raw()))
    }

    /// First header named `name` (case-insensitive), unfolded and decoded.
    pub fn header_decoded(&self, name: &str) -> Option<String> {
        self.find_header(name).map(MailHeader::get_value)
    }

    pub fn headers(&self) -> impl Iterator<Item = HeaderLine> + 'p {
        self.mail.headers.iter().map(HeaderLine::new)
    }

    /// The `Content-Type` header, if the part has a non-empty one.
    pub fn declared_content_type(&self) -> Option<String> {
        self.header("content-type").filter(|ct| !ct.is_empty())
    }

    /// The content type, falling back to `text/x-unknown`. Never empty.
    pub fn content_type(&self) -> String {
        self.declared_content_type()
            .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string())
    }

    /// The `charset` parameter of the content type.
    pub fn charset(&self) -> Option<String> {
        self.declared_content_type()?;
        self.mail
            .ctype
            .params
            .get("charset")
            .filter(|cs| !cs.is_empty())
            .cloned()
    }

    /// The part's file name.
    ///
    /// Taken from the `filename` parameter of `Content-Disposition` when
    /// that header is present, otherwise from the `name` parameter of
    /// `Content-Type`. RFC 2047 words and RFC 2231 `filename*=` values are
    /// decoded.
    pub fn filename(&self) -> Option<String> {
        let name = match self.find_header("content-disposition") {
            Some(cd) => mailparse::parse_content_disposition(&cd.get_value())
                .params
                .remove("filename"),
            None => {
                self.declared_content_type()?;
                self.mail.ctype.params.get("name").cloned()
            }
        }?;
        (!name.is_empty()).then_some(name)
    }

    /// The body with its transfer encoding removed; `None` if it cannot be decoded.
    ///
    /// Line breaks inside the body are returned as written. For a multipart
    /// child the break before the next boundary is not part of the body.
    pub fn body(&self) -> Option<Vec<u8>> {
        let own = |raw: &'p [u8]| {
            if self.in_multipart {
                transfer::strip_boundary_break(raw)
            } else {
                raw
            }
        };
        let decoded = match self.mail.get_body_encoded() {
            Body::Base64(body) => body.get_decoded(),
            Body::QuotedPrintable(body) => {
                Ok(transfer::decode_quoted_printable(own(body.get_raw())))
            }
            Body::SevenBit(body) | Body::EightBit(body) => Ok(own(body.get_raw()).to_vec()),
            Body::Binary(body) => Ok(own(body.get_raw()).to_vec()),
        };
        match decoded {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(error = %e, "Undecodable part body");
                None
            }
        }
    }

    /// Children of a multipart part, in order.
    pub fn children(&self) -> impl Iterator<Item = Part<'p>> + 'p {
        self.mail.subparts.iter().map(|mail| Part::new(mail, true))
    }
}

/// Split raw message bytes at the first blank line.
fn split_at_header_end(data: &[u8]) -> (&[u8], &[u8]) {
    match find_header_end(data) {
        Some((end, sep)) => (&data[..end], &data[end + sep..]),
        None => (data, &[]),
    }
}

/// Find where headers end: the offset just past the last header's line
/// break, and the length of the blank line that follows.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    if data.starts_with(b"\r\n") {
        return Some((0, 2));
    }
    if data.starts_with(b"\n") {
        return Some((0, 1));
    }
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some((i + 1, 1));
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some((i + 2, 2));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"From: a@b.com\nSubject: Hi\nMIME-Version: 1.0\n\nBody\n";

    #[test]
    fn test_find_header_end() {
        // "From: a@b.com\n" = 14 bytes, "Subject: Hi\n" = 12 bytes
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some((26, 1)));
    }

    #[test]
    fn test_find_header_end_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some((28, 2)));
    }

    #[test]
    fn test_raw_split() {
        let msg = Message::parse(SIMPLE).unwrap();
        assert_eq!(
            msg.raw_headers(),
            b"From: a@b.com\nSubject: Hi\nMIME-Version: 1.0\n"
        );
        assert_eq!(msg.raw_body(), b"Body\n");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let msg = Message::parse(SIMPLE).unwrap();
        assert_eq!(msg.header("SUBJECT").as_deref(), Some("Hi"));
        assert_eq!(msg.header("cc"), None);
    }

    #[test]
    fn test_headers_restartable() {
        let msg = Message::parse(SIMPLE).unwrap();
        let first: Vec<_> = msg.headers().map(|h| h.name).collect();
        let second: Vec<_> = msg.headers().map(|h| h.name).collect();
        assert_eq!(first, vec!["From", "Subject", "MIME-Version"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_mime() {
        assert!(Message::parse(SIMPLE).unwrap().is_mime());
        let old = Message::parse(b"Subject: old\n\nplain\n").unwrap();
        assert!(!old.is_mime());
        let commented = Message::parse(b"MIME-Version: 1.0 (generated)\n\nx\n").unwrap();
        assert!(commented.is_mime());
        let bogus = Message::parse(b"MIME-Version: 1.01\n\nx\n").unwrap();
        assert!(!bogus.is_mime());
    }

    #[test]
    fn test_content_type_sentinel() {
        let msg = Message::parse(b"Subject: x\n\nbody\n").unwrap();
        assert_eq!(msg.root().content_type(), "text/x-unknown");
        assert_eq!(msg.root().declared_content_type(), None);
    }

    #[test]
    fn test_filename_prefers_disposition() {
        let raw = b"Content-Type: application/pdf; name=\"ct.pdf\"\n\
Content-Disposition: attachment; filename=\"cd.pdf\"\n\nx";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.root().filename().as_deref(), Some("cd.pdf"));
    }

    #[test]
    fn test_filename_from_content_type() {
        let raw = b"Content-Type: image/png; name=\"=?UTF-8?Q?caf=C3=A9.png?=\"\n\nx";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.root().filename().as_deref(), Some("café.png"));
    }

    #[test]
    fn test_filename_disposition_without_parameter() {
        let raw = b"Content-Type: image/png; name=\"a.png\"\nContent-Disposition: inline\n\nx";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.root().filename(), None);
    }

    #[test]
    fn test_charset() {
        let raw = b"Content-Type: text/plain; charset=\"ISO-8859-1\"\n\nx";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.root().charset().as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_body_is_transfer_decoded() {
        let raw = b"Content-Type: text/plain\nContent-Transfer-Encoding: base64\n\naGVsbG8=\n";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.root().body().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_filename_rfc2231() {
        let raw = b"Content-Type: application/pdf\n\
Content-Disposition: attachment; filename*=UTF-8''caf%C3%A9.pdf\n\nx";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.root().filename().as_deref(), Some("café.pdf"));
    }

    #[test]
    fn test_decoded_headers() {
        let raw = b"Subject: =?ISO-8859-1?Q?K=F6ln?= =?UTF-8?B?IG11bmRv?=\n\nx";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.header_decoded("subject").as_deref(), Some("Köln mundo"));
        assert_eq!(
            msg.header("subject").as_deref(),
            Some("=?ISO-8859-1?Q?K=F6ln?= =?UTF-8?B?IG11bmRv?=")
        );
        let line = msg.headers().next().unwrap();
        assert_eq!(line.display(), "Subject: Köln mundo");
    }

    const CHILDREN: &[u8] = b"MIME-Version: 1.0\n\
Content-Type: multipart/mixed; boundary=\"b\"\n\
\n\
--b\n\
Content-Type: text/plain\n\
\n\
first\n\
--b\n\
Content-Type: text/plain; charset=utf-8\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
line one\n\
line two=\n\
 joined\n\
\n\
--b\n\
Content-Type: application/octet-stream\n\
Content-Transfer-Encoding: base64\n\
\n\
c2Vjb25k\n\
--b--\n";

    fn child_bodies(raw: &[u8]) -> Vec<Vec<u8>> {
        let msg = Message::parse(raw).unwrap();
        let root = msg.root();
        root.children().map(|p| p.body().unwrap()).collect()
    }

    #[test]
    fn test_child_body_excludes_boundary_break() {
        let bodies = child_bodies(CHILDREN);
        assert_eq!(bodies[0], b"first");
        assert_eq!(bodies[2], b"second");
    }

    #[test]
    fn test_quoted_printable_child_keeps_lf_breaks() {
        let bodies = child_bodies(CHILDREN);
        // the last line's own break survives, only the delimiter's goes
        assert_eq!(bodies[1], b"line one\nline two joined\n");
    }

    #[test]
    fn test_single_part_body_untouched() {
        let msg = Message::parse(b"Subject: x\n\nline\n\n").unwrap();
        assert_eq!(msg.root().body().as_deref(), Some(&b"line\n\n"[..]));
    }

    #[test]
    fn test_open_missing_file() {
        let err = MessageSource::open("/nonexistent/mimewalk/msg.eml").unwrap_err();
        assert!(matches!(err, MimeError::NotFound(_)));
    }
}
