//! Request URL and connection [`Origin`].
use std::num::NonZeroU16;
use std::sync::Arc;

/// Absolute `http` or `https` URL.
///
/// ```not_rust
/// URL         = scheme "://" authority path-abempty [ "?" query ] [ "#" fragment ]
/// authority   = [ userinfo "@" ] host [ ":" port ]
/// ```
///
/// Userinfo and fragment are accepted but never sent on the wire.
///
/// ```not_rust
///   https://example.com:8042/over/there?name=ferret
///   \___/   \_________/ \__/\_________/ \_________/
///     |          |       |       |           |
///  scheme       host   port    path        query
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    value: Arc<str>,
    origin: Origin,
    // path start
    path: u16,
    // query start, point to either `?` or path end
    query: u16,
    // fragment start or end of value
    end: u16,
}

/// URL scheme supported by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plaintext `http`.
    Http,
    /// `https`, HTTP over TLS.
    Https,
}

/// Scheme, host, and port identifying a distinct remote endpoint and TLS boundary.
///
/// Two requests may share a connection only when their origins are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: Scheme,
    /// lowercase, without IPv6 brackets
    host: Arc<str>,
    port: u16,
}

impl Url {
    /// Parse an absolute `http` or `https` URL.
    pub fn parse(value: &str) -> Result<Self, InvalidUri> {
        parse_url(Arc::from(value))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[inline]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.value[self.path as usize..self.query as usize]
    }

    #[inline]
    pub fn query(&self) -> Option<&str> {
        if self.query == self.end {
            None
        } else {
            Some(&self.value[(self.query + 1) as usize..self.end as usize])
        }
    }

    /// Returns the request target in origin form, e.g: `/search?q=rust`.
    ///
    /// The returned target may have empty path, in which case it is written on the wire with
    /// a leading `/`.
    #[inline]
    pub fn target(&self) -> &str {
        &self.value[self.path as usize..self.end as usize]
    }

    /// Returns `true` if the target needs a leading `/` when written on the wire.
    #[inline]
    pub(crate) fn needs_root_slash(&self) -> bool {
        self.path == self.query
    }
}

impl std::str::FromStr for Url {
    type Err = InvalidUri;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
    }
}

impl TryFrom<&str> for Url {
    type Error = InvalidUri;

    #[inline]
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
    }
}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

// ===== Origin =====

impl Origin {
    pub fn new(scheme: Scheme, host: &str, port: Option<u16>) -> Self {
        Self {
            scheme,
            host: Arc::from(host.to_ascii_lowercase()),
            port: port.unwrap_or(scheme.default_port()),
        }
    }

    #[inline]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub const fn is_tls(&self) -> bool {
        matches!(self.scheme, Scheme::Https)
    }

    /// Write the `Host` header value, port is omitted when it is the scheme default.
    pub(crate) fn write_host(&self, buf: &mut bytes::BytesMut) {
        if self.host.contains(':') {
            buf.extend_from_slice(b"[");
            buf.extend_from_slice(self.host.as_bytes());
            buf.extend_from_slice(b"]");
        } else {
            buf.extend_from_slice(self.host.as_bytes());
        }
        if self.port != self.scheme.default_port() {
            buf.extend_from_slice(b":");
            buf.extend_from_slice(itoa::Buffer::new().format(self.port).as_bytes());
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme.as_str(), self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
        }
    }
}

impl Scheme {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    #[inline]
    pub const fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

// ===== Parser =====

/// ```not_rust
/// URL = scheme "://" authority path-abempty [ "?" query ] [ "#" fragment ]
/// ```
///
/// [source](https://datatracker.ietf.org/doc/html/rfc3986#section-3)
fn parse_url(value: Arc<str>) -> Result<Url, InvalidUri> {
    use InvalidUri::*;

    if value.len() > u16::MAX as usize {
        return Err(TooLong);
    }

    let buf = value.as_bytes();

    let scheme_len = parse_scheme(buf)?;
    let scheme = match &buf[..scheme_len as usize] {
        s if s.eq_ignore_ascii_case(b"http") => Scheme::Http,
        s if s.eq_ignore_ascii_case(b"https") => Scheme::Https,
        _ => return Err(UnsupportedScheme),
    };

    const COL_DELIM: u16 = "://".len() as _;

    let rest = &buf[(scheme_len + 1) as usize..];
    if rest.first_chunk::<2>() != Some(b"//") {
        return Err(Incomplete);
    }

    let auth_start = scheme_len + COL_DELIM;
    let auth_len = parse_authority(&buf[auth_start as usize..])?;
    let Some(auth_len) = NonZeroU16::new(auth_len) else {
        return Err(MissingHost);
    };
    let (host, port) = parse_host_port(&value[auth_start as usize..(auth_start + auth_len.get()) as usize])?;

    let path = auth_start + auth_len.get();
    let (path_len, query_len) = parse_path_query(&buf[path as usize..]);
    let query = path + path_len;
    let end = query + query_len;

    Ok(Url {
        origin: Origin::new(scheme, host, port),
        value,
        path,
        query,
        end,
    })
}

/// ```not_rust
/// scheme      = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
/// ```
///
/// terminated by `:`
///
/// [source](https://datatracker.ietf.org/doc/html/rfc3986#section-3.1)
fn parse_scheme(buf: &[u8]) -> Result<u16, InvalidUri> {
    use InvalidUri::*;

    let Some(lead) = buf.first() else {
        return Err(Incomplete);
    };

    if !lead.is_ascii_alphabetic() {
        return Err(Char(*lead as char));
    }

    let mut n = 1;

    loop {
        let Some(byte) = buf.get(n) else {
            return Err(Incomplete);
        };

        match byte {
            b'+' | b'-' | b'.' => {}
            b':' => break,
            e if e.is_ascii_alphanumeric() => {}
            ch => return Err(Char(*ch as char)),
        }

        n += 1;
    }

    n.try_into().map_err(|_| TooLong)
}

/// ```not_rust
/// authority   = [ userinfo "@" ] host [ ":" port ]
/// ```
///
/// terminated by `/`, `?`, `#`, or by the end
///
/// [source](https://datatracker.ietf.org/doc/html/rfc3986#section-3.2)
fn parse_authority(buf: &[u8]) -> Result<u16, InvalidUri> {
    use InvalidUri::*;

    let mut n = 0;

    loop {
        match buf.get(n) {
            Some(b'/' | b'?' | b'#') | None => break,
            Some(ch) if ch.is_ascii_whitespace() || ch.is_ascii_control() => {
                return Err(Char(*ch as char));
            }
            Some(_) => n += 1,
        }
    }

    n.try_into().map_err(|_| TooLong)
}

fn parse_host_port(authority: &str) -> Result<(&str, Option<u16>), InvalidUri> {
    use InvalidUri::*;

    // userinfo is never forwarded
    let hostport = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    let (host, port) = if let Some(ipv6) = hostport.strip_prefix('[') {
        let Some(close) = ipv6.find(']') else {
            return Err(Char('['));
        };
        let port = match &ipv6[close + 1..] {
            "" => None,
            p => match p.strip_prefix(':') {
                Some(p) => Some(p),
                None => return Err(InvalidPort),
            },
        };
        (&ipv6[..close], port)
    } else {
        match hostport.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (hostport, None),
        }
    };

    if host.is_empty() {
        return Err(MissingHost);
    }

    let port = match port {
        // `http://example.com:/` is valid and means default port
        None | Some("") => None,
        Some(port) => match port.parse::<u16>() {
            Ok(ok) => Some(ok),
            Err(_) => return Err(InvalidPort),
        },
    };

    Ok((host, port))
}

/// Returns the path length and query length (including `?`), fragment is excluded.
///
/// [source](https://datatracker.ietf.org/doc/html/rfc3986#section-3.3)
fn parse_path_query(buf: &[u8]) -> (u16, u16) {
    let end = buf.iter().position(|e| *e == b'#').unwrap_or(buf.len());
    let path = buf[..end].iter().position(|e| *e == b'?').unwrap_or(end);
    // url length is checked to fit in u16
    (path as u16, (end - path) as u16)
}

// ===== Error =====

/// A possible error value when parsing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidUri {
    /// Bytes ends before all components parsed.
    Incomplete,
    /// Bytes length is too large.
    TooLong,
    /// Invalid character found.
    Char(char),
    /// Scheme is not `http` or `https`.
    UnsupportedScheme,
    /// Authority has no host.
    MissingHost,
    /// Port is not a valid number.
    InvalidPort,
}

impl std::error::Error for InvalidUri { }

impl std::fmt::Display for InvalidUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use InvalidUri::*;
        f.write_str("invalid url: ")?;
        match self {
            Incomplete => f.write_str("url incomplete"),
            TooLong => f.write_str("url too long"),
            Char(ch) => write!(f, "unexpected character `{ch}`"),
            UnsupportedScheme => f.write_str("unsupported scheme"),
            MissingHost => f.write_str("missing host"),
            InvalidPort => f.write_str("invalid port"),
        }
    }
}
