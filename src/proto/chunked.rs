use bytes::{Buf, Bytes, BytesMut};
use std::fmt::Write;
use std::task::Poll;

use super::ProtoError;
use super::parser::{MAX_HEADERS, MAX_HEAD_SIZE, parse_header};
use crate::common::ParseResult;
use crate::headers::Headers;

/// Chunk size of 16 hex digits or more is rejected.
const MAX_CHUNK_DIGITS: usize = 15;

/// Maximum length of chunk size line, including extensions.
const MAX_CHUNK_LINE: usize = 4096;

/// The terminal chunk with an empty trailer section.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

const CRLF: &[u8] = b"\r\n";

/// Chunked transfer-coding decoder.
#[derive(Clone, Debug)]
pub struct ChunkedDecoder {
    phase: Phase,
    trailers: Headers,
    trailer_size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Expecting `chunk-size [ chunk-ext ] CRLF`.
    Size,
    /// Remaining bytes of current chunk data.
    Data(u64),
    /// Expecting `CRLF` after chunk data.
    DataCrlf,
    /// Expecting trailer fields until an empty line.
    Trailers,
    Eof,
}

impl ChunkedDecoder {
    pub(crate) fn new() -> Self {
        Self { phase: Phase::Size, trailers: Headers::new(), trailer_size: 0 }
    }

    /// Returns `true` if terminal chunk and trailer section is decoded.
    #[inline]
    pub(crate) fn is_eof(&self) -> bool {
        self.phase == Phase::Eof
    }

    /// Take decoded trailer fields.
    pub(crate) fn take_trailers(&mut self) -> Headers {
        std::mem::take(&mut self.trailers)
    }

    /// Decode the next chunk data from `buffer`.
    ///
    /// Returns `Poll::Pending` if more bytes is required, `Poll::Ready(None)` when the terminal
    /// chunk and trailer section is decoded.
    pub(crate) fn decode_chunk(
        &mut self,
        buffer: &mut BytesMut,
    ) -> Poll<Option<Result<BytesMut, ProtoError>>> {
        loop {
            match self.phase {
                Phase::Size => {
                    let Some(lf) = buffer.iter().position(|e| *e == b'\n') else {
                        if buffer.len() > MAX_CHUNK_LINE {
                            return Poll::Ready(Some(Err(ProtoError::InvalidChunk)));
                        }
                        return Poll::Pending;
                    };
                    let size = match parse_chunk_size(&buffer[..lf]) {
                        Ok(size) => size,
                        Err(err) => return Poll::Ready(Some(Err(err))),
                    };
                    buffer.advance(lf + 1);
                    self.phase = match size {
                        0 => Phase::Trailers,
                        size => Phase::Data(size),
                    };
                }
                Phase::Data(remaining) => {
                    if buffer.is_empty() {
                        return Poll::Pending;
                    }
                    let cnt = remaining.min(buffer.len() as u64);
                    let chunk = buffer.split_to(cnt as usize);
                    self.phase = match remaining - cnt {
                        0 => Phase::DataCrlf,
                        leftover => Phase::Data(leftover),
                    };
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Phase::DataCrlf => {
                    match buffer.first_chunk::<2>() {
                        Some(b"\r\n") => buffer.advance(2),
                        Some([b'\n', _]) => buffer.advance(1),
                        Some(_) => return Poll::Ready(Some(Err(ProtoError::InvalidChunk))),
                        None => match buffer.first() {
                            Some(b'\n') => buffer.advance(1),
                            Some(b'\r') | None => return Poll::Pending,
                            Some(_) => return Poll::Ready(Some(Err(ProtoError::InvalidChunk))),
                        },
                    }
                    self.phase = Phase::Size;
                }
                Phase::Trailers => {
                    let before = buffer.len();
                    let result = parse_header(buffer);
                    self.trailer_size += before - buffer.len();
                    if self.trailer_size > MAX_HEAD_SIZE {
                        return Poll::Ready(Some(Err(ProtoError::HeadTooLarge)));
                    }
                    match result {
                        ParseResult::Pending => {
                            // unfinished trailer line stays in `buffer`
                            if self.trailer_size + buffer.len() > MAX_HEAD_SIZE {
                                return Poll::Ready(Some(Err(ProtoError::HeadTooLarge)));
                            }
                            return Poll::Pending;
                        }
                        ParseResult::Err(err) => return Poll::Ready(Some(Err(err))),
                        ParseResult::Ok(Some((name, value))) => {
                            if self.trailers.len() >= MAX_HEADERS {
                                return Poll::Ready(Some(Err(ProtoError::TooManyHeaders)));
                            }
                            self.trailers.append(name, value);
                        }
                        ParseResult::Ok(None) => self.phase = Phase::Eof,
                    }
                }
                Phase::Eof => return Poll::Ready(None),
            }
        }
    }
}

/// Parse `chunk-size [ chunk-ext ]`, with optional trailing `CR`.
fn parse_chunk_size(line: &[u8]) -> Result<u64, ProtoError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let digits_len = line.iter().position(|e| !e.is_ascii_hexdigit()).unwrap_or(line.len());
    if digits_len == 0 {
        return Err(ProtoError::InvalidChunk);
    }

    // leading zeros does not count toward the size limit
    let digits = &line[..digits_len];
    let significant = digits.iter().position(|e| *e != b'0').map_or(&digits[..0], |i| &digits[i..]);
    if significant.len() > MAX_CHUNK_DIGITS {
        return Err(ProtoError::ChunkTooLarge);
    }

    let size = significant.iter().fold(0u64, |acc, e| {
        let digit = match e {
            b'0'..=b'9' => e - b'0',
            b'a'..=b'f' => e - b'a' + 10,
            _ => e - b'A' + 10,
        };
        (acc << 4) | digit as u64
    });

    // chunk extensions are ignored, `BWS ";" ...`
    match line[digits_len..].trim_ascii_start().first() {
        None | Some(b';') => Ok(size),
        Some(_) => Err(ProtoError::InvalidChunk),
    }
}

// ===== Encoder =====

/// Encode a single chunk.
///
/// Empty chunk is not encoded, since it would be read as the terminal chunk.
pub fn encode_chunk(chunk: Bytes) -> EncodedBuf {
    if chunk.is_empty() {
        return EncodedBuf::exact(chunk);
    }

    let mut header = BytesMut::with_capacity(16 + CRLF.len());
    // writing to `BytesMut` never fails
    let _ = write!(header, "{:X}\r\n", chunk.len());

    EncodedBuf::chunks(header.freeze(), chunk, CRLF)
}

/// The return type for encoded message body chunk.
///
/// The returned bytes must be written in following order: `header`, `chunk`, then `trail`.
#[derive(Debug)]
pub struct EncodedBuf {
    pub header: Bytes,
    pub chunk: Bytes,
    pub trail: &'static [u8],
}

impl EncodedBuf {
    pub fn exact(chunk: Bytes) -> Self {
        Self { header: Bytes::new(), chunk, trail: b"" }
    }

    pub fn chunks(header: Bytes, chunk: Bytes, trail: &'static [u8]) -> Self {
        Self { header, chunk, trail }
    }

    /// Total number of bytes written on the wire.
    pub fn len(&self) -> usize {
        self.header.len() + self.chunk.len() + self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
