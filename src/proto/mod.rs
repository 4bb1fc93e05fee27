//! HTTP/1.1 Codec.
//!
//! Request head encoding, incremental response head parsing, and message body framing. All
//! operations work on `BytesMut` buffers and never perform IO, the connection interleaves
//! socket reads with the parser.
mod error;
mod parser;
mod chunked;
mod coder;
mod encode;

pub use crate::common::ParseResult;
pub use error::ProtoError;
pub use parser::{
    MAX_HEAD_SIZE, MAX_HEADERS, ResponseHead, ResponseParser, StatusLine, parse_header,
    parse_status_line,
};
pub use chunked::{EncodedBuf, LAST_CHUNK, encode_chunk};
pub use coder::{BodyDecoder, BodyEncoder};
pub use encode::{RequestHead, encode_head};

#[cfg(test)]
mod test;
