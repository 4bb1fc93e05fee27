//! HTTP Response
use bytes::Bytes;

use crate::{
    body::{BodyStream, Incoming},
    error::{Error, ErrorKind},
    headers::Headers,
    http::Version,
    proto::ResponseHead,
};

/// HTTP Response.
///
/// Status code, reason phrase and header pairs are exposed exactly as received. The body can
/// be taken once, taking it again fails with [`ErrorKind::StreamConsumed`].
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: u16,
    reason: Bytes,
    headers: Headers,
    body: Option<Incoming>,
}

/// Constructor
impl Response {
    pub(crate) fn new(head: ResponseHead, body: Incoming) -> Self {
        let ResponseHead { version, status, reason, headers } = head;
        Self { version, status, reason, headers, body: Some(body) }
    }

    /// Read the whole body into memory.
    pub(crate) async fn buffer(&mut self) -> Result<(), Error> {
        match &mut self.body {
            Some(body) => body.buffer().await,
            None => Ok(()),
        }
    }
}

impl Response {
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the status code.
    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the reason phrase, possibly empty.
    #[inline]
    pub fn reason(&self) -> &[u8] {
        &self.reason
    }

    /// Returns the header pairs in the order received.
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the first header value with given name.
    #[inline]
    pub fn header(&self, name: impl AsRef<[u8]>) -> Option<&Bytes> {
        self.headers.get(name)
    }

    /// Returns shared reference to [`Incoming`], or `None` if the body is taken.
    #[inline]
    pub fn body(&self) -> Option<&Incoming> {
        self.body.as_ref()
    }

    /// Returns the trailer fields once the body is completely read.
    pub fn trailers(&self) -> Option<&Headers> {
        self.body.as_ref().and_then(Incoming::trailers)
    }
}

/// Body
impl Response {
    /// Take the response body.
    pub fn take_body(&mut self) -> Result<Incoming, Error> {
        self.body.take().ok_or_else(|| Error::new(ErrorKind::StreamConsumed))
    }

    /// Returns the body as a lazy [`Stream`] of chunks.
    ///
    /// [`Stream`]: futures_core::Stream
    #[inline]
    pub fn stream(&mut self) -> Result<BodyStream, Error> {
        self.take_body().map(Incoming::into_stream)
    }

    /// Read the whole body.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        self.take_body()?.collect().await
    }

    /// Discard the body.
    ///
    /// If the body is not completely read, the connection is closed instead of returned to
    /// the pool.
    #[inline]
    pub fn discard(&mut self) {
        if let Some(body) = self.body.take() {
            body.discard();
        }
    }
}
