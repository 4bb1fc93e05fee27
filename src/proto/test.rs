use bytes::{Bytes, BytesMut};
use std::task::Poll;

use super::*;
use crate::common::ParseResult;
use crate::headers::Headers;
use crate::http::{Method, Url, Version};

macro_rules! ready {
    ($e:expr) => {
        match $e {
            ParseResult::Ok(ok) => ok,
            ParseResult::Err(err) => panic!("unexpected `ParseResult::Err`: {err:?}"),
            ParseResult::Pending => panic!("unexpected `ParseResult::Pending`")
        }
    };
}

fn parse_head(raw: &[u8]) -> ResponseHead {
    let mut bytes = BytesMut::from(&raw[..]);
    ready!(ResponseParser::new().parse(&mut bytes))
}

/// Feed `pieces` one by one whenever the decoder asks for more bytes, collecting the body.
fn decode_all(decoder: &mut BodyDecoder, pieces: &[&[u8]]) -> Result<Vec<u8>, ProtoError> {
    let mut buffer = BytesMut::new();
    let mut body = Vec::new();
    let mut pieces = pieces.iter();
    loop {
        match decoder.decode_chunk(&mut buffer) {
            Poll::Ready(Some(Ok(chunk))) => body.extend_from_slice(&chunk),
            Poll::Ready(Some(Err(err))) => return Err(err),
            Poll::Ready(None) => return Ok(body),
            Poll::Pending => match pieces.next() {
                Some(piece) => buffer.extend_from_slice(piece),
                None => {
                    decoder.decode_eof()?;
                    return Ok(body);
                }
            },
        }
    }
}

fn chunked_decoder() -> BodyDecoder {
    let head = parse_head(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n");
    BodyDecoder::new(&Method::GET, &head).unwrap()
}

#[test]
fn test_parse_status_line() {
    macro_rules! test {
        (#[pending] $input:literal) => {
            let mut bytes = BytesMut::from(&$input[..]);
            match parse_status_line(&mut bytes) {
                ParseResult::Pending => { }
                ParseResult::Ok(val) => panic!("expected `Pending`, but its `Ok` with: {val:?}"),
                ParseResult::Err(val) => panic!("expected `Pending`, but its `Err` with: {val:?}"),
            }
            assert_eq!(&bytes[..], $input);
        };
        (#[error] $input:literal, $err:ident) => {
            let mut bytes = BytesMut::from(&$input[..]);
            match parse_status_line(&mut bytes) {
                ParseResult::Err(err) => assert_eq!(err, ProtoError::$err),
                ParseResult::Ok(ok) => panic!("expected `Err` but returns `Ok` with {ok:?}"),
                ParseResult::Pending => panic!("line {}, unexpected `Pending`", line!()),
            }
        };
        {
            $input:literal;
            $v:ident, $status:literal, $reason:literal;
            $rest:literal
        } => {
            let mut bytes = BytesMut::from(&$input[..]);
            let line = ready!(parse_status_line(&mut bytes));
            assert_eq!(line.version, Version::$v);
            assert_eq!(line.status, $status);
            assert_eq!(&line.reason[..], $reason);
            assert_eq!(&bytes[..], $rest, "invalid remaining bytes");
        };
    }

    test! {
        b"HTTP/1.1 200 OK\r\n";
        HTTP_11, 200, b"OK";
        b""
    };
    test! {
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n";
        HTTP_11, 404, b"Not Found";
        b"Content-Length: 0\r\n"
    };
    test! {
        b"HTTP/1.0 204 \n";
        HTTP_10, 204, b"";
        b""
    };
    test! {
        b"HTTP/1.1 500\r\n";
        HTTP_11, 500, b"";
        b""
    };

    test!(#[pending] b"");
    test!(#[pending] b"HTTP/1.1 200 OK");
    test!(#[pending] b"HTTP/1.1 200 OK\r");

    test!(#[error] b"HTTP/2 200 OK\r\n", UnsupportedVersion);
    test!(#[error] b"HTTP/1.1 20 OK\r\n", InvalidStatusCode);
    test!(#[error] b"HTTP/1.1 2x0 OK\r\n", InvalidStatusCode);
    test!(#[error] b"HTTP/1.1 099 OK\r\n", InvalidStatusCode);
    test!(#[error] b"HTTP/1.1  200 OK\r\n", InvalidStatusCode);
    test!(#[error] b"ICY 200 OK\r\n", InvalidStatusLine);
    test!(#[error] b"HTTP/1.1\r\n", InvalidStatusLine);
    test!(#[error] b"HTTP/1.1 200 O\rK\r\n", InvalidSeparator);
}

#[test]
fn test_parse_header() {
    macro_rules! test {
        (#[pending] $input:literal) => {
            let mut bytes = BytesMut::from(&$input[..]);
            assert!(parse_header(&mut bytes).is_pending());
            assert_eq!(&bytes[..], $input);
        };
        (#[error] $input:literal) => {
            let mut bytes = BytesMut::from(&$input[..]);
            assert!(parse_header(&mut bytes).is_err());
        };
        (#[end] $input:literal, $rest:literal) => {
            let mut bytes = BytesMut::from(&$input[..]);
            assert!(ready!(parse_header(&mut bytes)).is_none());
            assert_eq!(&bytes[..], $rest);
        };
        ($input:literal => $name:literal: $value:literal; $rest:literal) => {
            let mut bytes = BytesMut::from(&$input[..]);
            let (name, value) = ready!(parse_header(&mut bytes)).unwrap();
            assert_eq!(&name[..], $name);
            assert_eq!(&value[..], $value);
            assert_eq!(&bytes[..], $rest);
        };
    }

    test!(b"Content-Type: text/html\r\n" => b"Content-Type": b"text/html"; b"");
    test!(b"content-length:12\r\n\r\n" => b"content-length": b"12"; b"\r\n");
    test!(b"X-Padded: \t spaced out \t\r\n" => b"X-Padded": b"spaced out"; b"");
    test!(b"X-Empty:\n" => b"X-Empty": b""; b"");
    test!(b"Host: a:80\r\n" => b"Host": b"a:80"; b"");

    test!(#[end] b"\r\n", b"");
    test!(#[end] b"\nHello", b"Hello");
    test!(#[end] b"\r\nHello, world", b"Hello, world");

    test!(#[pending] b"");
    test!(#[pending] b"\r");
    test!(#[pending] b"Content-Type: text/html");

    test!(#[error] b"Content-Type text/html\r\n");
    test!(#[error] b"Content Type: text/html\r\n");
    test!(#[error] b": no name\r\n");
    test!(#[error] b" folded\r\n");
    test!(#[error] b"\rX");
}

#[test]
fn test_response_parser() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\nX-Dup: a\r\nx-dup: b\r\n\r\nHello, world";

    // byte by byte
    let mut parser = ResponseParser::new();
    let mut bytes = BytesMut::new();
    let mut head = None;
    for byte in raw {
        bytes.extend_from_slice(&[*byte]);
        match parser.parse(&mut bytes) {
            ParseResult::Pending => {}
            ParseResult::Ok(ok) => {
                head = Some(ok);
                break;
            }
            ParseResult::Err(err) => panic!("unexpected error: {err:?}"),
        }
    }

    let head = head.unwrap();
    assert_eq!(head.status, 200);
    assert_eq!(&head.reason[..], b"OK");
    assert_eq!(head.headers.len(), 3);
    assert_eq!(head.headers.get_all("X-DUP").count(), 2);
    assert!(head.is_keep_alive());
    assert!(bytes.is_empty());

    // all at once, body left in buffer
    let mut bytes = BytesMut::from(&raw[..]);
    let head = ready!(ResponseParser::new().parse(&mut bytes));
    assert_eq!(head.status, 200);
    assert_eq!(&bytes[..], b"Hello, world");
}

#[test]
fn test_response_parser_limits() {
    let mut raw = b"HTTP/1.1 200 OK\r\n".to_vec();
    for i in 0..=MAX_HEADERS {
        raw.extend_from_slice(format!("X-Header-{i}: value\r\n").as_bytes());
    }
    raw.extend_from_slice(b"\r\n");
    let mut bytes = BytesMut::from(&raw[..]);
    match ResponseParser::new().parse(&mut bytes) {
        ParseResult::Err(err) => assert_eq!(err, ProtoError::TooManyHeaders),
        _ => panic!("expected too many headers"),
    }

    let mut raw = b"HTTP/1.1 200 OK\r\nX-Large: ".to_vec();
    raw.resize(MAX_HEAD_SIZE + 1, b'a');
    let mut bytes = BytesMut::from(&raw[..]);
    match ResponseParser::new().parse(&mut bytes) {
        ParseResult::Err(err) => assert_eq!(err, ProtoError::HeadTooLarge),
        _ => panic!("expected head too large"),
    }
}

#[test]
fn test_keep_alive() {
    assert!(parse_head(b"HTTP/1.1 200 OK\r\n\r\n").is_keep_alive());
    assert!(!parse_head(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").is_keep_alive());
    assert!(!parse_head(b"HTTP/1.1 200 OK\r\nConnection: Upgrade, Close\r\n\r\n").is_keep_alive());
    assert!(!parse_head(b"HTTP/1.0 200 OK\r\n\r\n").is_keep_alive());
    assert!(parse_head(b"HTTP/1.0 200 OK\r\nConnection: keep-alive\r\n\r\n").is_keep_alive());
}

#[test]
fn test_body_framing() {
    macro_rules! framing {
        ($method:ident, $raw:literal) => {
            BodyDecoder::new(&Method::$method, &parse_head($raw))
        };
    }

    let decoder = framing!(GET, b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n").unwrap();
    assert_eq!(decoder.size_hint(), Some(12));

    let decoder = framing!(GET, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").unwrap();
    assert!(decoder.is_eof());

    let decoder = framing!(GET, b"HTTP/1.1 200 OK\r\nContent-Length: 7, 7\r\n\r\n").unwrap();
    assert_eq!(decoder.size_hint(), Some(7));

    let decoder = framing!(GET, b"HTTP/1.1 200 OK\r\nTransfer-Encoding: Chunked\r\n\r\n").unwrap();
    assert_eq!(decoder.size_hint(), None);
    assert!(!decoder.is_close_delimited());

    let decoder = framing!(GET, b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
    assert!(decoder.is_close_delimited());

    // bodiless regardless of framing headers
    assert!(framing!(HEAD, b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n").unwrap().is_eof());
    assert!(framing!(GET, b"HTTP/1.1 204 No Content\r\n\r\n").unwrap().is_eof());
    assert!(framing!(GET, b"HTTP/1.1 304 Not Modified\r\nContent-Length: 5\r\n\r\n").unwrap().is_eof());

    macro_rules! error {
        ($raw:literal, $err:ident) => {
            assert_eq!(framing!(GET, $raw).unwrap_err(), ProtoError::$err);
        };
    }

    error!(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nTransfer-Encoding: chunked\r\n\r\n", ConflictingFraming);
    error!(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nContent-Length: 5\r\n\r\n", InvalidContentLength);
    error!(b"HTTP/1.1 200 OK\r\nContent-Length: -1\r\n\r\n", InvalidContentLength);
    error!(b"HTTP/1.1 200 OK\r\nContent-Length: 99999999999999999999\r\n\r\n", InvalidContentLength);
    error!(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip, chunked\r\n\r\n", UnknownCodings);
    error!(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked, chunked\r\n\r\n", UnknownCodings);
}

#[test]
fn test_content_length_body() {
    let head = parse_head(b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n");

    let mut decoder = BodyDecoder::new(&Method::GET, &head).unwrap();
    let body = decode_all(&mut decoder, &[b"Hello", b", ", b"world"]).unwrap();
    assert_eq!(body, b"Hello, world");
    assert!(decoder.is_eof());

    // bytes of the next message are left untouched
    let mut decoder = BodyDecoder::new(&Method::GET, &head).unwrap();
    let mut buffer = BytesMut::from(&b"Hello, worldHTTP/1.1"[..]);
    let Poll::Ready(Some(Ok(chunk))) = decoder.decode_chunk(&mut buffer) else {
        panic!("expected chunk")
    };
    assert_eq!(&chunk[..], b"Hello, world");
    assert!(matches!(decoder.decode_chunk(&mut buffer), Poll::Ready(None)));
    assert_eq!(&buffer[..], b"HTTP/1.1");

    let mut decoder = BodyDecoder::new(&Method::GET, &head).unwrap();
    let err = decode_all(&mut decoder, &[b"Hello"]).unwrap_err();
    assert_eq!(err, ProtoError::IncompleteBody);
}

#[test]
fn test_close_delimited_body() {
    let head = parse_head(b"HTTP/1.0 200 OK\r\n\r\n");
    let mut decoder = BodyDecoder::new(&Method::GET, &head).unwrap();
    let body = decode_all(&mut decoder, &[b"until ", b"close"]).unwrap();
    assert_eq!(body, b"until close");
    assert!(decoder.is_eof());
}

#[test]
fn test_chunked_body() {
    const RAW: &[u8] = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";

    let body = decode_all(&mut chunked_decoder(), &[RAW]).unwrap();
    assert_eq!(body, b"Wikipedia");

    // every split point
    for at in 0..=RAW.len() {
        let (left, right) = RAW.split_at(at);
        let body = decode_all(&mut chunked_decoder(), &[left, right]).unwrap();
        assert_eq!(body, b"Wikipedia", "split at {at}");
    }

    // byte by byte
    let pieces: Vec<&[u8]> = RAW.chunks(1).collect();
    let mut decoder = chunked_decoder();
    assert_eq!(decode_all(&mut decoder, &pieces).unwrap(), b"Wikipedia");
    assert!(decoder.is_eof());

    // the terminal chunk is required
    let err = decode_all(&mut chunked_decoder(), &[&RAW[..RAW.len() - 5]]).unwrap_err();
    assert_eq!(err, ProtoError::IncompleteBody);
}

#[test]
fn test_chunked_arbitrary_boundaries() {
    let payload: Vec<u8> = (0..2000u32).map(|e| (e % 251) as u8).collect();

    // encode with varying chunk sizes
    let mut raw = Vec::new();
    let mut encoder = BodyEncoder::Chunked;
    for (i, chunk) in payload.chunks(173).enumerate() {
        let chunk = &chunk[..chunk.len().min(1 + i * 37 % 173)];
        let encoded = encoder.encode_chunk(Bytes::copy_from_slice(chunk)).unwrap();
        raw.extend_from_slice(&encoded.header);
        raw.extend_from_slice(&encoded.chunk);
        raw.extend_from_slice(encoded.trail);
    }
    raw.extend_from_slice(encoder.encode_eof().unwrap());

    let expected: Vec<u8> = payload
        .chunks(173)
        .enumerate()
        .flat_map(|(i, chunk)| chunk[..chunk.len().min(1 + i * 37 % 173)].to_vec())
        .collect();

    for size in [1, 2, 3, 7, 64, 500, raw.len()] {
        let pieces: Vec<&[u8]> = raw.chunks(size).collect();
        let body = decode_all(&mut chunked_decoder(), &pieces).unwrap();
        assert_eq!(body, expected, "socket read size {size}");
    }
}

#[test]
fn test_chunked_extensions_and_trailers() {
    let raw = b"5;name=value\r\nHello\r\n7 ; a\r\n, world\r\n0\r\nExpires: never\r\nX-Sum: 1\r\n\r\n";

    let mut decoder = chunked_decoder();
    let body = decode_all(&mut decoder, &[raw]).unwrap();
    assert_eq!(body, b"Hello, world");

    let trailers = decoder.take_trailers();
    assert_eq!(trailers.len(), 2);
    assert_eq!(trailers.get("expires").map(|e| &e[..]), Some(&b"never"[..]));
    assert!(decoder.take_trailers().is_empty());

    let body = decode_all(&mut chunked_decoder(), &[b"a\r\n0123456789\r\n0000\r\n\r\n"]).unwrap();
    assert_eq!(body, b"0123456789");
}

#[test]
fn test_chunked_errors() {
    macro_rules! error {
        ($raw:literal, $err:ident) => {
            let err = decode_all(&mut chunked_decoder(), &[$raw]).unwrap_err();
            assert_eq!(err, ProtoError::$err);
        };
    }

    error!(b"xyz\r\nWiki\r\n0\r\n\r\n", InvalidChunk);
    error!(b"\r\nWiki\r\n0\r\n\r\n", InvalidChunk);
    error!(b"4 x\r\nWiki\r\n0\r\n\r\n", InvalidChunk);
    error!(b"4\r\nWikiXX0\r\n\r\n", InvalidChunk);
    error!(b"FFFFFFFFFFFFFFFF\r\n", ChunkTooLarge);
    error!(b"0\r\nbad trailer\r\n\r\n", InvalidHeader);
}

#[test]
fn test_chunked_trailer_limit() {
    // trailer line without LF
    let mut raw = b"0\r\nX-Trailer: ".to_vec();
    raw.resize(1024 * 1024, b'a');
    let err = decode_all(&mut chunked_decoder(), &[&raw[..]]).unwrap_err();
    assert_eq!(err, ProtoError::HeadTooLarge);

    // same, arriving piece by piece
    let pieces: Vec<&[u8]> = raw.chunks(4096).collect();
    let err = decode_all(&mut chunked_decoder(), &pieces).unwrap_err();
    assert_eq!(err, ProtoError::HeadTooLarge);

    // under the limit is still pending
    let mut decoder = super::chunked::ChunkedDecoder::new();
    let mut buffer = BytesMut::from(&raw[..1024]);
    assert!(decoder.decode_chunk(&mut buffer).is_pending());
    assert_eq!(buffer.len(), 1024 - 3);
}

#[test]
fn test_chunk_encoding() {
    let encoded = encode_chunk(Bytes::from_static(b"abcdefghijklmnopqrstuvwxyz"));
    assert_eq!(&encoded.header[..], b"1A\r\n");
    assert_eq!(&encoded.chunk[..], b"abcdefghijklmnopqrstuvwxyz");
    assert_eq!(encoded.trail, b"\r\n");
    assert_eq!(encoded.len(), 4 + 26 + 2);

    // empty chunk would terminate the body
    assert!(encode_chunk(Bytes::new()).is_empty());

    let mut encoder = BodyEncoder::Length(5);
    assert!(encoder.encode_chunk(Bytes::from_static(b"abc")).is_ok());
    assert_eq!(encoder.encode_eof().unwrap_err(), ProtoError::BodyLengthMismatch);
    assert_eq!(
        encoder.encode_chunk(Bytes::from_static(b"def")).unwrap_err(),
        ProtoError::BodyLengthMismatch
    );
    assert!(encoder.encode_chunk(Bytes::from_static(b"de")).is_ok());
    assert_eq!(encoder.encode_eof().unwrap(), b"");
}

#[test]
fn test_encode_head() {
    macro_rules! test {
        ($method:ident $url:literal, [$($name:literal: $value:literal),*], $len:expr => $expected:literal, $encoder:expr) => {
            let url = Url::parse($url).unwrap();
            let fields: Vec<(Bytes, Bytes)> = vec![$((Bytes::from_static($name), Bytes::from_static($value))),*];
            let headers = Headers::from(fields);
            let mut buf = BytesMut::new();
            let encoder = encode_head(
                RequestHead { method: &Method::$method, url: &url, headers: &headers, body_len: $len },
                &mut buf,
            )
            .unwrap();
            assert_eq!(std::str::from_utf8(&buf).unwrap(), $expected);
            assert_eq!(encoder, $encoder);
        };
    }

    test!(
        GET "http://example.com", [], Some(0)
        => "GET / HTTP/1.1\r\nHost: example.com\r\n\r\n", BodyEncoder::Length(0)
    );
    test!(
        GET "http://example.com?q=1#frag", [], Some(0)
        => "GET /?q=1 HTTP/1.1\r\nHost: example.com\r\n\r\n", BodyEncoder::Length(0)
    );
    test!(
        GET "http://Example.com:8080/a/b?c=d", [b"accept": b"*/*", b"X-Case": b"Kept"], Some(0)
        => "GET /a/b?c=d HTTP/1.1\r\nHost: example.com:8080\r\naccept: */*\r\nX-Case: Kept\r\n\r\n",
        BodyEncoder::Length(0)
    );
    test!(
        GET "https://example.com:443/", [b"Host": b"override"], Some(0)
        => "GET / HTTP/1.1\r\nHost: override\r\n\r\n", BodyEncoder::Length(0)
    );
    test!(
        POST "http://example.com/", [], Some(0)
        => "POST / HTTP/1.1\r\nHost: example.com\r\nContent-Length: 0\r\n\r\n", BodyEncoder::Length(0)
    );
    test!(
        PUT "http://example.com/", [], Some(11)
        => "PUT / HTTP/1.1\r\nHost: example.com\r\nContent-Length: 11\r\n\r\n", BodyEncoder::Length(11)
    );
    test!(
        POST "http://example.com/", [], None
        => "POST / HTTP/1.1\r\nHost: example.com\r\nTransfer-Encoding: chunked\r\n\r\n", BodyEncoder::Chunked
    );
    test!(
        POST "http://example.com/", [b"Content-Length": b"3"], None
        => "POST / HTTP/1.1\r\nHost: example.com\r\nContent-Length: 3\r\n\r\n", BodyEncoder::Length(3)
    );
    test!(
        POST "http://example.com/", [b"transfer-encoding": b"chunked"], Some(3)
        => "POST / HTTP/1.1\r\nHost: example.com\r\ntransfer-encoding: chunked\r\n\r\n", BodyEncoder::Chunked
    );
}

#[test]
fn test_encode_head_invalid() {
    macro_rules! error {
        ([$($name:literal: $value:literal),*], $len:expr) => {
            let url = Url::parse("http://example.com/").unwrap();
            let fields: Vec<(Bytes, Bytes)> = vec![$((Bytes::from_static($name), Bytes::from_static($value))),*];
            let headers = Headers::from(fields);
            let mut buf = BytesMut::new();
            let err = encode_head(
                RequestHead { method: &Method::POST, url: &url, headers: &headers, body_len: $len },
                &mut buf,
            )
            .unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidRequest);
        };
    }

    error!([b"X-Bad": b"a\r\nInjected: 1"], Some(0));
    error!([b"Bad Name": b"a"], Some(0));
    error!([b"Content-Length": b"abc"], None);
    error!([b"Content-Length": b"4"], Some(3));
    error!([b"Content-Length": b"3", b"Transfer-Encoding": b"chunked"], Some(3));
    error!([b"Transfer-Encoding": b"gzip"], None);
    error!([b"Transfer-Encoding": b"gzip, chunked"], None);
    error!([b"Transfer-Encoding": b"gzip", b"Transfer-Encoding": b"chunked"], None);
}
