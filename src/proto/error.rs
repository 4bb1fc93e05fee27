// ===== Protocol Error =====

/// HTTP/1.1 framing or syntax error.
///
/// Any of these leaves the wire position of a connection indeterminate, the connection that
/// produced it is never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// Status line is not `HTTP-version SP status-code SP reason-phrase`.
    InvalidStatusLine,
    /// Unsupported HTTP version.
    UnsupportedVersion,
    /// Status code is not three digits.
    InvalidStatusCode,
    /// Invalid header line.
    InvalidHeader,
    /// Invalid line separator.
    InvalidSeparator,
    /// Too many header fields.
    TooManyHeaders,
    /// Response head exceeds the maximum size.
    HeadTooLarge,
    /// Invalid or duplicate `Content-Length` value.
    InvalidContentLength,
    /// Both `Content-Length` and `Transfer-Encoding` are present.
    ConflictingFraming,
    /// Unknown or unsupported `Transfer-Encoding` codings.
    UnknownCodings,
    /// Chunk size line is not a valid hexadecimal length or chunk is not terminated by CRLF.
    InvalidChunk,
    /// Chunk size is too large.
    ChunkTooLarge,
    /// Message body ends before the declared length.
    IncompleteBody,
    /// Message body produced more or less bytes than the declared length.
    BodyLengthMismatch,
}

impl ProtoError {
    const fn message(&self) -> &'static str {
        match self {
            Self::InvalidStatusLine => "invalid status line",
            Self::UnsupportedVersion => "unsupported version",
            Self::InvalidStatusCode => "invalid status code",
            Self::InvalidHeader => "invalid header",
            Self::InvalidSeparator => "invalid separator",
            Self::TooManyHeaders => "too many headers",
            Self::HeadTooLarge => "response head too large",
            Self::InvalidContentLength => "invalid content length",
            Self::ConflictingFraming => "both content-length and transfer-encoding present",
            Self::UnknownCodings => "unknown or unsupported message body codings",
            Self::InvalidChunk => "invalid chunked format",
            Self::ChunkTooLarge => "chunk too large",
            Self::IncompleteBody => "message body ends before declared length",
            Self::BodyLengthMismatch => "message body length does not match declared length",
        }
    }
}

impl std::error::Error for ProtoError {}

impl std::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
