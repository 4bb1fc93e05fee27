//! HTTP/1.1 Response Head Parser.
//!
//! [`parse_status_line`] works on chunked bytes, given any length of bytes, the parser will find
//! the next separator and advance the bytes past it. If the separator is not found, then the
//! parser returns [`ParseResult::Pending`] and leaves the bytes untouched, where more bytes is
//! required to complete parsing.
//!
//! [`parse_header`] works the same way. Additionally, if the parser encounter an empty line
//! with separator, it returns [`ParseResult::Ok(None)`] denoting that its the end of header
//! fields.
//!
//! [`ResponseParser`] drives both over a connection read buffer and enforces size limits.
//!
//! [`ParseResult::Ok(None)`]: ParseResult::Ok
use bytes::{Buf, Bytes, BytesMut};

use super::ProtoError;
use crate::common::{ParseResult, ready};
use crate::headers::Headers;
use crate::http::{Version, is_tchar};

/// Maximum number of header fields in a response head or trailer section.
pub const MAX_HEADERS: usize = 100;

/// Maximum size of a response head, status line and header fields included.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

const VERSION_SIZE: usize = b"HTTP/1.1".len();

/// Parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: Version,
    pub status: u16,
    pub reason: Bytes,
}

/// Parsed response head, status line and header fields.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: u16,
    pub reason: Bytes,
    pub headers: Headers,
}

impl ResponseHead {
    /// Returns `true` for `1xx` responses, which precede the final response.
    #[inline]
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }

    /// Returns `true` if the server allows the connection to persist after this response.
    pub fn is_keep_alive(&self) -> bool {
        if self.headers.has_token("connection", b"close") {
            return false;
        }
        self.version.is_keep_alive_default() || self.headers.has_token("connection", b"keep-alive")
    }
}

// ===== Status Line =====

/// Parse response status line.
///
/// This function performs a chunked parsing, see [module level documentation] for more details.
///
/// [module level documentation]: crate::proto::parser
pub fn parse_status_line(bytes: &mut BytesMut) -> ParseResult<StatusLine, ProtoError> {
    use ParseResult as Result;

    if bytes.is_empty() {
        return Result::Pending;
    }

    let line = ready!(split_line(bytes)).freeze();

    if !line.starts_with(b"HTTP/") {
        return Result::Err(ProtoError::InvalidStatusLine);
    }

    // `HTTP/1.1 200`
    if line.len() < VERSION_SIZE + 4 {
        return Result::Err(ProtoError::InvalidStatusLine);
    }

    let Some(version) = Version::from_bytes(&line[..VERSION_SIZE]) else {
        return Result::Err(ProtoError::UnsupportedVersion);
    };

    if line[VERSION_SIZE] != b' ' {
        return Result::Err(ProtoError::InvalidStatusLine);
    }

    let status = {
        let digits = &line[VERSION_SIZE + 1..VERSION_SIZE + 4];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Result::Err(ProtoError::InvalidStatusCode);
        }
        let status = digits.iter().fold(0u16, |acc, d| acc * 10 + (d - b'0') as u16);
        if status < 100 {
            return Result::Err(ProtoError::InvalidStatusCode);
        }
        status
    };

    // reason phrase is optional, including its leading space
    let reason = match line.get(VERSION_SIZE + 4) {
        None => Bytes::new(),
        Some(b' ') => line.slice(VERSION_SIZE + 5..),
        Some(_) => return Result::Err(ProtoError::InvalidStatusCode),
    };

    Result::Ok(StatusLine { version, status, reason })
}

// ===== Header =====

/// Parse header field.
///
/// Returns `ParseResult::Ok(None)` when encounter an empty line with separator.
///
/// This function performs a chunked parsing, see [module level documentation] for more details.
///
/// [module level documentation]: crate::proto::parser
pub fn parse_header(bytes: &mut BytesMut) -> ParseResult<Option<(Bytes, Bytes)>, ProtoError> {
    use ParseResult as Result;

    match bytes.first() {
        None => return Result::Pending,
        Some(b'\r') => {
            return match bytes.get(1) {
                Some(b'\n') => {
                    bytes.advance(2);
                    Result::Ok(None)
                }
                Some(_) => Result::Err(ProtoError::InvalidSeparator),
                None => Result::Pending,
            };
        }
        Some(b'\n') => {
            bytes.advance(1);
            return Result::Ok(None);
        }
        // obsolete line folding
        Some(b' ' | b'\t') => return Result::Err(ProtoError::InvalidHeader),
        Some(_) => {}
    }

    let line = ready!(split_line(bytes)).freeze();

    let Some(colon) = line.iter().position(|e| *e == b':') else {
        return Result::Err(ProtoError::InvalidHeader);
    };

    if colon == 0 || !line[..colon].iter().copied().all(is_tchar) {
        return Result::Err(ProtoError::InvalidHeader);
    }

    let value = &line[colon + 1..];
    let start = value.iter().position(|e| !matches!(e, b' ' | b'\t')).unwrap_or(value.len());
    let end = value.iter().rposition(|e| !matches!(e, b' ' | b'\t')).map_or(start, |e| e + 1);

    Result::Ok(Some((
        line.slice(..colon),
        line.slice(colon + 1 + start..colon + 1 + end),
    )))
}

/// Split a line terminated by `LF` or `CRLF`, the returned line excludes the separator.
fn split_line(bytes: &mut BytesMut) -> ParseResult<BytesMut, ProtoError> {
    let Some(lf) = bytes.iter().position(|e| *e == b'\n') else {
        return ParseResult::Pending;
    };

    let mut line = bytes.split_to(lf + 1);
    line.truncate(lf);
    if line.last() == Some(&b'\r') {
        line.truncate(lf - 1);
    }

    // bare CR
    if line.contains(&b'\r') {
        return ParseResult::Err(ProtoError::InvalidSeparator);
    }

    ParseResult::Ok(line)
}

// ===== Response Parser =====

/// Incremental response head parser.
///
/// Feed the connection read buffer on every read until it returns `Ok`, the parsed bytes are
/// advanced out of the buffer, leaving the beginning of the message body if any.
#[derive(Debug, Default)]
pub struct ResponseParser {
    status: Option<StatusLine>,
    headers: Headers,
    size: usize,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, bytes: &mut BytesMut) -> ParseResult<ResponseHead, ProtoError> {
        use ParseResult as Result;

        loop {
            let before = bytes.len();

            let step = match &self.status {
                None => parse_status_line(bytes).map(Step::Status),
                Some(_) => parse_header(bytes).map(Step::Header),
            };

            self.size += before - bytes.len();
            if self.size > MAX_HEAD_SIZE {
                return Result::Err(ProtoError::HeadTooLarge);
            }

            match step {
                Result::Pending => {
                    if self.size + bytes.len() > MAX_HEAD_SIZE {
                        return Result::Err(ProtoError::HeadTooLarge);
                    }
                    return Result::Pending;
                }
                Result::Err(err) => return Result::Err(err),
                Result::Ok(Step::Status(line)) => self.status = Some(line),
                Result::Ok(Step::Header(Some((name, value)))) => {
                    if self.headers.len() >= MAX_HEADERS {
                        return Result::Err(ProtoError::TooManyHeaders);
                    }
                    self.headers.append(name, value);
                }
                Result::Ok(Step::Header(None)) => {
                    let Some(StatusLine { version, status, reason }) = self.status.take() else {
                        return Result::Err(ProtoError::InvalidStatusLine);
                    };
                    self.size = 0;
                    return Result::Ok(ResponseHead {
                        version,
                        status,
                        reason,
                        headers: std::mem::take(&mut self.headers),
                    });
                }
            }
        }
    }
}

enum Step {
    Status(StatusLine),
    Header(Option<(Bytes, Bytes)>),
}
