//! HTTP Request
use bytes::Bytes;

use crate::{
    body::Body,
    error::Error,
    headers::Headers,
    http::{Method, Url},
};

/// HTTP Request.
///
/// Headers are written on the wire verbatim, in order, after the `Host` header the pool adds
/// when none is supplied.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Body,
    stream: bool,
}

/// Constructor
impl Request {
    /// Create [`Request`] with empty headers and body.
    #[inline]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: Body::empty(),
            stream: false,
        }
    }

    /// Create [`Request`] by parsing `method` and `url`.
    ///
    /// Fails with [`ErrorKind::InvalidRequest`] if the method is not a valid token, or
    /// [`ErrorKind::InvalidUrl`] and [`ErrorKind::UnsupportedScheme`] if the url cannot be
    /// used.
    ///
    /// [`ErrorKind::InvalidRequest`]: crate::ErrorKind::InvalidRequest
    /// [`ErrorKind::InvalidUrl`]: crate::ErrorKind::InvalidUrl
    /// [`ErrorKind::UnsupportedScheme`]: crate::ErrorKind::UnsupportedScheme
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        Ok(Self::new(method.parse()?, Url::parse(url)?))
    }

    /// Create `GET` [`Request`].
    #[inline]
    pub fn get(url: &str) -> Result<Self, Error> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    /// Create `POST` [`Request`].
    #[inline]
    pub fn post(url: &str, body: impl Into<Body>) -> Result<Self, Error> {
        Ok(Self::new(Method::POST, Url::parse(url)?).with_body(body))
    }
}

/// Builder
impl Request {
    /// Append a header pair.
    #[inline]
    pub fn with_header(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all headers.
    #[inline]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    #[inline]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Return the response before its body is read.
    ///
    /// The connection stays checked out until the body is read to completion, see
    /// [`Incoming`].
    ///
    /// [`Incoming`]: crate::Incoming
    #[inline]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

impl Request {
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns shared reference to [`Headers`].
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns mutable reference to [`Headers`].
    #[inline]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns shared reference to [`Body`].
    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns mutable reference to [`Body`].
    #[inline]
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Returns `true` if the response body is streamed.
    #[inline]
    pub fn is_stream(&self) -> bool {
        self.stream
    }
}

/// Destructor
impl Request {
    #[inline]
    pub(crate) fn into_parts(self) -> (Method, Url, Headers, Body, bool) {
        (self.method, self.url, self.headers, self.body, self.stream)
    }
}
