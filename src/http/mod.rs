//! HTTP Protocol.
mod method;
mod version;

pub mod uri;

pub use method::{Method, UnknownMethod};
pub(crate) use method::is_tchar;
#[doc(inline)]
pub use uri::{Origin, Scheme, Url};
pub use version::Version;
