// rfc-editor.org/rfc/rfc9112.html#name-message-body-length
//
// 1. HEAD, 1xx, 204 and 304 responses never carry content
// 2. Transfer-Encoding with Content-Length is rejected
// 3. Transfer-Encoding must be exactly `chunked`
// 4. Content-Length, duplicates must agree
// 5. otherwise read until the server closes the connection
use bytes::{Bytes, BytesMut};
use std::task::Poll;

use super::ProtoError;
use super::chunked::{ChunkedDecoder, EncodedBuf, LAST_CHUNK, encode_chunk};
use super::parser::ResponseHead;
use crate::headers::Headers;
use crate::http::Method;

/// Response message body decoder.
#[derive(Debug)]
pub struct BodyDecoder {
    kind: Kind,
    trailers: Headers,
}

#[derive(Debug)]
enum Kind {
    /// Remaining bytes.
    Length(u64),
    Chunked(ChunkedDecoder),
    CloseDelimited,
    Eof,
}

impl BodyDecoder {
    /// Decoder for a body that is already complete.
    #[inline]
    pub fn empty() -> Self {
        Self { kind: Kind::Eof, trailers: Headers::new() }
    }

    /// Determine response message body framing.
    pub fn new(method: &Method, head: &ResponseHead) -> Result<Self, ProtoError> {
        if method.is_head()
            || head.is_informational()
            || matches!(head.status, 204 | 304)
            || (*method == Method::CONNECT && (200..300).contains(&head.status))
        {
            return Ok(Self::empty());
        }

        let headers = &head.headers;
        let has_te = headers.contains("transfer-encoding");
        let content_length = parse_content_length(headers)?;

        let kind = match (content_length, has_te) {
            (Some(_), true) => return Err(ProtoError::ConflictingFraming),
            (None, true) => {
                if !is_chunked_only(headers) {
                    return Err(ProtoError::UnknownCodings);
                }
                Kind::Chunked(ChunkedDecoder::new())
            }
            (Some(0), false) => Kind::Eof,
            (Some(len), false) => Kind::Length(len),
            (None, false) => Kind::CloseDelimited,
        };

        Ok(Self { kind, trailers: Headers::new() })
    }

    /// Returns `true` if the body is completely decoded.
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, Kind::Eof)
    }

    /// Returns `true` if the body ends only when the server closes the connection.
    #[inline]
    pub fn is_close_delimited(&self) -> bool {
        matches!(self.kind, Kind::CloseDelimited)
    }

    /// Returns the remaining body length if known.
    pub fn size_hint(&self) -> Option<u64> {
        match self.kind {
            Kind::Length(len) => Some(len),
            Kind::Eof => Some(0),
            Kind::Chunked(_) | Kind::CloseDelimited => None,
        }
    }

    /// Decode the next body chunk from `buffer`.
    ///
    /// Returns `Poll::Pending` if more data read is required, and `Poll::Ready(None)` when the
    /// body is completely decoded.
    pub fn decode_chunk(
        &mut self,
        buffer: &mut BytesMut,
    ) -> Poll<Option<Result<BytesMut, ProtoError>>> {
        match &mut self.kind {
            Kind::Eof => Poll::Ready(None),
            Kind::Chunked(decoder) => {
                let result = decoder.decode_chunk(buffer);
                if decoder.is_eof() {
                    self.trailers = decoder.take_trailers();
                    self.kind = Kind::Eof;
                }
                result
            }
            Kind::Length(remaining) => {
                if buffer.is_empty() {
                    return Poll::Pending;
                }
                let cnt = (*remaining).min(buffer.len() as u64);
                *remaining -= cnt;
                let chunk = buffer.split_to(cnt as usize);
                if *remaining == 0 {
                    self.kind = Kind::Eof;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Kind::CloseDelimited => {
                if buffer.is_empty() {
                    return Poll::Pending;
                }
                Poll::Ready(Some(Ok(buffer.split())))
            }
        }
    }

    /// Take trailer fields, only available after a chunked body is completely decoded.
    pub fn take_trailers(&mut self) -> Headers {
        std::mem::take(&mut self.trailers)
    }

    /// Signal that the server closed the connection.
    ///
    /// Returns error if the body is not yet complete, unless it is close delimited.
    pub fn decode_eof(&mut self) -> Result<(), ProtoError> {
        match self.kind {
            Kind::Eof => Ok(()),
            Kind::CloseDelimited => {
                self.kind = Kind::Eof;
                Ok(())
            }
            Kind::Length(_) | Kind::Chunked(_) => Err(ProtoError::IncompleteBody),
        }
    }
}

/// Parse all `Content-Length` fields, which must agree on a single value.
fn parse_content_length(headers: &Headers) -> Result<Option<u64>, ProtoError> {
    let mut length = None;
    for value in headers.get_all("content-length") {
        // `Content-Length: 5, 5` is a list of the same value
        for item in value.split(|e| *e == b',') {
            let Some(len) = atou(item.trim_ascii()) else {
                return Err(ProtoError::InvalidContentLength);
            };
            match length {
                Some(prev) if prev != len => return Err(ProtoError::InvalidContentLength),
                _ => length = Some(len),
            }
        }
    }
    Ok(length)
}

/// Returns `true` if `Transfer-Encoding` codings is exactly `chunked`.
pub(crate) fn is_chunked_only(headers: &Headers) -> bool {
    let mut codings = headers
        .get_all("transfer-encoding")
        .flat_map(|value| value.split(|e| *e == b','))
        .map(<[u8]>::trim_ascii)
        .filter(|e| !e.is_empty());

    matches!(
        (codings.next(), codings.next()),
        (Some(coding), None) if coding.eq_ignore_ascii_case(b"chunked")
    )
}

/// Parse non empty ASCII digits into `u64`, returns `None` on overflow.
pub(crate) fn atou(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    bytes.iter().try_fold(0u64, |acc, e| {
        if !e.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add((e - b'0') as u64)
    })
}

// ===== Encoder =====

/// Request message body encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoder {
    /// Remaining bytes.
    Length(u64),
    Chunked,
}

impl BodyEncoder {
    /// Encode message body chunk.
    ///
    /// Returns [`EncodedBuf`] which is just a bytes that also may contains chunk header.
    pub fn encode_chunk(&mut self, chunk: Bytes) -> Result<EncodedBuf, ProtoError> {
        match self {
            Self::Chunked => Ok(encode_chunk(chunk)),
            Self::Length(remaining) => match remaining.checked_sub(chunk.len() as u64) {
                Some(rem) => {
                    *remaining = rem;
                    Ok(EncodedBuf::exact(chunk))
                }
                None => Err(ProtoError::BodyLengthMismatch),
            },
        }
    }

    /// Returns the bytes that terminate the message body.
    pub fn encode_eof(&self) -> Result<&'static [u8], ProtoError> {
        match self {
            Self::Chunked => Ok(LAST_CHUNK),
            Self::Length(0) => Ok(b"".as_slice()),
            Self::Length(_) => Err(ProtoError::BodyLengthMismatch),
        }
    }
}
