//! Streaming conversion of text bodies from their declared charset to UTF-8.
//!
//! The conversion runs chunk by chunk through a fixed-size buffer. A full
//! buffer is the normal signal to emit and keep going, not an error.

use std::io::Write;

use encoding_rs::{DecoderResult, Encoding};
use tracing::warn;

use crate::error::{MimeError, Result};

/// Size of the output buffer each conversion step fills.
pub const CHUNK_SIZE: usize = 4096;

/// Whether a declared charset has to go through the converter.
///
/// Bodies without a charset, or in UTF-8/US-ASCII, are written as-is.
pub fn needs_recoding(charset: Option<&str>) -> bool {
    match charset {
        None => false,
        Some(cs) => {
            let cs = cs.trim();
            !(cs.eq_ignore_ascii_case("utf-8")
                || cs.eq_ignore_ascii_case("utf8")
                || cs.eq_ignore_ascii_case("us-ascii"))
        }
    }
}

/// Convert `body` from `source_encoding` to UTF-8, writing it to `out`.
///
/// Guarantees the emitted text ends with a newline. An unknown encoding
/// emits nothing; malformed input stops the conversion but keeps what was
/// already written.
pub fn recode<W: Write + ?Sized>(body: &[u8], source_encoding: &str, out: &mut W) -> Result<()> {
    let encoding = Encoding::for_label(source_encoding.trim().as_bytes())
        .ok_or_else(|| MimeError::UnsupportedEncoding(source_encoding.to_string()))?;

    let mut converter = Converter::new(encoding, body);
    let mut buf = [0u8; CHUNK_SIZE];

    let outcome = loop {
        match converter.step(&mut buf) {
            Step::Emit(0) => {}
            Step::Emit(n) => out.write_all(&buf[..n])?,
            Step::Done => break Ok(()),
            Step::Failed(err) => break Err(err),
        }
    };

    if converter.last_byte() != Some(b'\n') {
        out.write_all(b"\n")?;
    }
    outcome
}

/// Where a [`Converter`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing converted yet.
    Idle,
    /// Input remains.
    Converting,
    /// Input consumed; draining state held by the decoder.
    Flushing,
    Done,
    /// Malformed input at this offset.
    Failed { offset: usize },
}

/// Result of one conversion step.
#[derive(Debug)]
pub enum Step {
    /// This many bytes of the buffer hold converted output.
    Emit(usize),
    Done,
    Failed(MimeError),
}

/// Incremental decoder from one encoding to UTF-8.
pub struct Converter<'a> {
    encoding: &'static Encoding,
    decoder: encoding_rs::Decoder,
    input: &'a [u8],
    pos: usize,
    state: State,
    last_byte: Option<u8>,
}

impl<'a> Converter<'a> {
    pub fn new(encoding: &'static Encoding, input: &'a [u8]) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder_without_bom_handling(),
            input,
            pos: 0,
            state: State::Idle,
            last_byte: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The last byte emitted so far.
    pub fn last_byte(&self) -> Option<u8> {
        self.last_byte
    }

    /// Fill `buf` with the next piece of output.
    ///
    /// `buf` must hold at least one complete UTF-8 sequence (4 bytes).
    pub fn step(&mut self, buf: &mut [u8]) -> Step {
        match self.state {
            State::Idle => {
                self.state = State::Converting;
                self.step(buf)
            }
            State::Converting => {
                let (result, read, written) = self.decoder.decode_to_utf8_without_replacement(
                    &self.input[self.pos..],
                    buf,
                    false,
                );
                self.pos += read;
                self.state = match result {
                    DecoderResult::InputEmpty => State::Flushing,
                    DecoderResult::OutputFull => State::Converting,
                    DecoderResult::Malformed(..) => State::Failed { offset: self.pos },
                };
                self.emit(buf, written)
            }
            State::Flushing => {
                let (result, _, written) =
                    self.decoder
                        .decode_to_utf8_without_replacement(&[], buf, true);
                self.state = match result {
                    DecoderResult::InputEmpty => State::Done,
                    DecoderResult::OutputFull => State::Flushing,
                    DecoderResult::Malformed(..) => State::Failed { offset: self.pos },
                };
                self.emit(buf, written)
            }
            State::Done => Step::Done,
            State::Failed { offset } => {
                warn!(encoding = self.encoding.name(), offset, "Charset conversion failed");
                Step::Failed(MimeError::Conversion {
                    encoding: self.encoding.name().to_string(),
                    offset,
                })
            }
        }
    }

    fn emit(&mut self, buf: &[u8], written: usize) -> Step {
        if written > 0 {
            self.last_byte = Some(buf[written - 1]);
        }
        Step::Emit(written)
    }
}
