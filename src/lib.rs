//! Low level asynchronous HTTP/1.1 client connection pool.
//!
//! [`ConnectionPool`] issues requests and returns wire level responses: status code, raw
//! header pairs, and a lazily read body. Connections are reused per origin with keep-alive,
//! and every response body is bound to the connection that produced it until it is read to
//! completion.
//!
//! ```no_run
//! use h1pool::{ConnectionPool, PoolConfig, Request};
//!
//! # async fn app() -> Result<(), h1pool::Error> {
//! let pool = ConnectionPool::new(PoolConfig::default())?;
//!
//! let mut response = pool.request(Request::get("http://example.com/")?).await?;
//! assert_eq!(response.status(), 200);
//! let body = response.bytes().await?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_debug_implementations)]

pub mod http;
pub mod headers;
pub mod proto;

mod common;
mod log;

mod body;
mod conn;
mod pool;
mod request;
mod response;
mod error;

pub use body::{Body, BodyStream, Incoming};
pub use pool::{ConnectionPool, Limits, PoolConfig, PoolStats, Timeouts};
pub use request::Request;
pub use response::Response;
pub use error::{Error, ErrorKind};

pub use headers::Headers;
pub use http::{Method, Origin, Scheme, Url, Version};

pub use tokio_rustls::rustls;
