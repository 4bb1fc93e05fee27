use bytes::BytesMut;

use super::coder::{BodyEncoder, atou, is_chunked_only};
use crate::error::Error;
use crate::headers::Headers;
use crate::http::{Method, Url, Version};

/// Request head to be written on the wire.
#[derive(Debug)]
pub struct RequestHead<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub headers: &'a Headers,
    /// Body length if known up front.
    pub body_len: Option<u64>,
}

/// Write request line and header block into `buf`, returns the body framing.
///
/// Caller headers are written verbatim in order. `Host` is added unless present, and the
/// framing header is added unless the caller already supplied one.
pub fn encode_head(head: RequestHead, buf: &mut BytesMut) -> Result<BodyEncoder, Error> {
    let RequestHead { method, url, headers, body_len } = head;

    if headers.find_invalid().is_some() {
        return Err(Error::invalid_request("invalid header field"));
    }

    let framing = framing(method, headers, body_len)?;

    // request line
    buf.extend_from_slice(method.as_bytes());
    buf.extend_from_slice(b" ");
    if url.needs_root_slash() {
        buf.extend_from_slice(b"/");
    }
    buf.extend_from_slice(url.target().as_bytes());
    buf.extend_from_slice(b" ");
    buf.extend_from_slice(Version::HTTP_11.as_str().as_bytes());
    buf.extend_from_slice(b"\r\n");

    if !headers.contains("host") {
        buf.extend_from_slice(b"Host: ");
        url.origin().write_host(buf);
        buf.extend_from_slice(b"\r\n");
    }

    for (name, value) in headers {
        buf.extend_from_slice(name);
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value);
        buf.extend_from_slice(b"\r\n");
    }

    match framing {
        Framing::Supplied(_) | Framing::None => {}
        Framing::Length(len) => {
            buf.extend_from_slice(b"Content-Length: ");
            buf.extend_from_slice(itoa::Buffer::new().format(len).as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        Framing::Chunked => buf.extend_from_slice(b"Transfer-Encoding: chunked\r\n"),
    }

    buf.extend_from_slice(b"\r\n");

    Ok(framing.encoder())
}

enum Framing {
    /// Caller supplied framing header.
    Supplied(BodyEncoder),
    /// Empty body on a method that does not need framing header.
    None,
    Length(u64),
    Chunked,
}

impl Framing {
    fn encoder(&self) -> BodyEncoder {
        match *self {
            Framing::Supplied(encoder) => encoder,
            Framing::None => BodyEncoder::Length(0),
            Framing::Length(len) => BodyEncoder::Length(len),
            Framing::Chunked => BodyEncoder::Chunked,
        }
    }
}

fn framing(method: &Method, headers: &Headers, body_len: Option<u64>) -> Result<Framing, Error> {
    let has_te = headers.contains("transfer-encoding");

    let mut content_length = None;
    for value in headers.get_all("content-length") {
        let Some(len) = atou(value.trim_ascii()) else {
            return Err(Error::invalid_request("invalid content-length"));
        };
        if content_length.is_some_and(|prev| prev != len) {
            return Err(Error::invalid_request("multiple content-length"));
        }
        content_length = Some(len);
    }

    match (content_length, has_te) {
        (Some(_), true) => Err(Error::invalid_request(
            "both content-length and transfer-encoding present",
        )),
        (None, true) => {
            if !is_chunked_only(headers) {
                return Err(Error::invalid_request("unsupported transfer-encoding"));
            }
            Ok(Framing::Supplied(BodyEncoder::Chunked))
        }
        (Some(len), false) => {
            if body_len.is_some_and(|body_len| body_len != len) {
                return Err(Error::invalid_request("content-length does not match body length"));
            }
            Ok(Framing::Supplied(BodyEncoder::Length(len)))
        }
        (None, false) => Ok(match body_len {
            Some(0) if !method.expects_body() => Framing::None,
            Some(len) => Framing::Length(len),
            None => Framing::Chunked,
        }),
    }
}
