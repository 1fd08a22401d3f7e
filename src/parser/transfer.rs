//! Transfer decoding that keeps the body's own line breaks.
//!
//! `mailparse` hands out multipart children with the line break that
//! precedes the next boundary still attached, and its quoted-printable
//! decoder rewrites every hard break as CRLF. Both are handled here.

/// Drop the single line break that belongs to the following boundary
/// delimiter (RFC 2046 §5.1.1).
pub fn strip_boundary_break(body: &[u8]) -> &[u8] {
    body.strip_suffix(b"\r\n")
        .or_else(|| body.strip_suffix(b"\n"))
        .unwrap_or(body)
}

/// Decode a quoted-printable body.
///
/// `=XX` becomes the byte it names and `=` at the end of a line is a soft
/// break that joins the lines. Hard line breaks are copied as written
/// (`\n` stays `\n`, `\r\n` stays `\r\n`) and whitespace in front of them
/// is dropped. A malformed `=` sequence is kept literally.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'=' => {
                if let Some(skip) = soft_break_len(&input[i + 1..]) {
                    i += 1 + skip;
                } else if let Some(byte) = input.get(i + 1..i + 3).and_then(hex_byte) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'=');
                    i += 1;
                }
            }
            b' ' | b'\t' => {
                let run = input[i..]
                    .iter()
                    .take_while(|&&b| b == b' ' || b == b'\t')
                    .count();
                let next = input.get(i + run).copied();
                let at_line_end = matches!(next, Some(b'\n') | None)
                    || input[i + run..].starts_with(b"\r\n");
                if !at_line_end {
                    out.extend_from_slice(&input[i..i + run]);
                }
                i += run;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

/// Length of a soft line break following an `=`: optional blanks, then a
/// line break or the end of input.
fn soft_break_len(rest: &[u8]) -> Option<usize> {
    let blanks = rest
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    let tail = &rest[blanks..];
    if tail.is_empty() {
        Some(blanks)
    } else if tail.starts_with(b"\r\n") {
        Some(blanks + 2)
    } else if tail.starts_with(b"\n") {
        Some(blanks + 1)
    } else {
        None
    }
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    let digit = |b: u8| (b as char).to_digit(16);
    Some((digit(pair[0])? * 16 + digit(pair[1])?) as u8)
}
