use bytes::Bytes;

/// HTTP Method.
///
/// This API follows the [RFC9110] and the PATCH method from [RFC5789].
///
/// Extension methods are accepted as long as they are a valid [token].
///
/// [RFC5789]: https://www.rfc-editor.org/rfc/rfc5789
/// [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-methods>
/// [token]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-tokens>
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Method(Repr);

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
    Standard(u8),
    /// is valid token
    Extension(Bytes),
}

struct Props {
    safe: bool,
    idem: bool,
    body: bool,
    value: &'static [u8],
}

props! {
    static PROPS: [9];

    /// The [GET] method requests transfer of a current selected representation for the
    /// target resource.
    ///
    /// [GET]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-get>
    pub const GET = (0, b"GET", safe, idem, );
    /// The [HEAD] method is identical to GET except that the server MUST NOT send content in
    /// the response.
    ///
    /// [HEAD]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-head>
    pub const HEAD = (1, b"HEAD", safe, idem, );
    /// The [POST] method requests that the target resource process the representation
    /// enclosed in the request.
    ///
    /// [POST]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-post>
    pub const POST = (2, b"POST", , , body);
    /// The [PUT] method requests that the state of the target resource be created or
    /// replaced with the enclosed representation.
    ///
    /// [PUT]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-put>
    pub const PUT = (3, b"PUT", , idem, body);
    /// The [DELETE] method requests that the origin server remove the association between
    /// the target resource and its current functionality.
    ///
    /// [DELETE]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-delete>
    pub const DELETE = (4, b"DELETE", , idem, );
    /// The [CONNECT] method requests that the recipient establish a tunnel.
    ///
    /// [CONNECT]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-connect>
    pub const CONNECT = (5, b"CONNECT", , , );
    /// The [OPTIONS] method requests information about the communication options available
    /// for the target resource.
    ///
    /// [OPTIONS]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-options>
    pub const OPTIONS = (6, b"OPTIONS", safe, idem, );
    /// The [TRACE] method requests a remote, application-level loop-back of the request
    /// message.
    ///
    /// [TRACE]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-trace>
    pub const TRACE = (7, b"TRACE", safe, idem, );
    /// The [PATCH] method requests that a set of changes described in the request entity be
    /// applied to the resource.
    ///
    /// [PATCH]: <https://www.rfc-editor.org/rfc/rfc5789#section-2>
    pub const PATCH = (8, b"PATCH", , , body);
}

impl Method {
    /// Create [`Method`] from bytes, accepting extension methods.
    ///
    /// Returns `None` if `src` is empty or contains non token characters.
    pub fn from_bytes(src: &[u8]) -> Option<Method> {
        if let Some(ok) = Self::from_standard(src) {
            return Some(ok);
        }
        if src.is_empty() || !src.iter().copied().all(is_tchar) {
            return None;
        }
        Some(Self(Repr::Extension(Bytes::copy_from_slice(src))))
    }

    /// Returns `true` if method is considered ["safe"].
    ///
    /// Extension methods are never considered safe.
    ///
    /// ["safe"]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-safe-methods>
    #[inline]
    pub fn is_safe(&self) -> bool {
        match &self.0 {
            Repr::Standard(idx) => PROPS[*idx as usize].safe,
            Repr::Extension(_) => false,
        }
    }

    /// Returns `true` if method is considered ["idempotent"].
    ///
    /// ["idempotent"]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-idempotent-methods>
    #[inline]
    pub fn is_idempotent(&self) -> bool {
        match &self.0 {
            Repr::Standard(idx) => PROPS[*idx as usize].idem,
            Repr::Extension(_) => false,
        }
    }

    /// Returns `true` if the method conventionally carries content, in which case an empty
    /// body is still framed with `Content-Length: 0`.
    #[inline]
    pub fn expects_body(&self) -> bool {
        match &self.0 {
            Repr::Standard(idx) => PROPS[*idx as usize].body,
            Repr::Extension(_) => false,
        }
    }

    /// Returns `true` if this is the `HEAD` method.
    #[inline]
    pub fn is_head(&self) -> bool {
        *self == Self::HEAD
    }

    /// Returns the method bytes as written on the wire.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Standard(idx) => PROPS[*idx as usize].value,
            Repr::Extension(bytes) => bytes,
        }
    }

    /// Returns string representation of the method.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: standard values are static ASCII, extension values are validated tokens
        unsafe { std::str::from_utf8_unchecked(self.as_bytes()) }
    }
}

/// `tchar` from [RFC9110](https://www.rfc-editor.org/rfc/rfc9110.html#name-tokens).
pub(crate) const fn is_tchar(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
            | b'`' | b'|' | b'~'
    ) || byte.is_ascii_alphanumeric()
}

impl Default for Method {
    #[inline]
    fn default() -> Self {
        Self::GET
    }
}

impl std::str::FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes()).ok_or(UnknownMethod)
    }
}

impl TryFrom<&str> for Method {
    type Error = UnknownMethod;

    #[inline]
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Debug for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_str(), f)
    }
}

// ===== Error =====

/// An error when method is not a valid token.
pub struct UnknownMethod;

impl std::error::Error for UnknownMethod { }

impl std::fmt::Debug for UnknownMethod {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid method")
    }
}

impl std::fmt::Display for UnknownMethod {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid method")
    }
}

// ===== Macros =====

macro_rules! props {
    (
        static $props:ident: [$len:literal];
        $(
           $(#[$doc:meta])*
           pub const $name:ident = (
               $idx:literal, $val:literal, $($safe:ident)?, $($idem:ident)?, $($body:ident)?
           );
        )*
    ) => {
        impl Method {
            $(
               $(#[$doc])*
               pub const $name: Self = Self(Repr::Standard($idx));
            )*

            #[inline]
            const fn from_standard(src: &[u8]) -> Option<Method> {
                match src {
                    $(
                        $val => Some(Self::$name),
                    )*
                    _ => None,
                }
            }
        }

        static $props: [Props; $len] = [
            $(
                Props {
                    value: $val,
                    safe: prop!($($safe)?),
                    idem: prop!($($idem)?),
                    body: prop!($($body)?),
                },
            )*
        ];
    };
}

macro_rules! prop {
    (safe) => { true };
    (idem) => { true };
    (body) => { true };
    () => { false };
}

use {props, prop};
