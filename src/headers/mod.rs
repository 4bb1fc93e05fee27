//! Ordered HTTP Header Pairs.
//!
//! Unlike a header map, [`Headers`] keeps every field verbatim in the order it was written or
//! received, including the case of the name. Lookup is ASCII case-insensitive.
use bytes::Bytes;

use crate::http::is_tchar;

mod iter;

pub use iter::GetAll;


/// Ordered sequence of raw `(name, value)` header pairs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(Bytes, Bytes)>,
}

impl Headers {
    /// Create new empty [`Headers`].
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create new empty [`Headers`] with at least the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    /// Returns the number of header pairs, duplicate names are counted separately.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a header pair at the end.
    #[inline]
    pub fn append(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns the first value with given name.
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&Bytes> {
        self.get_all(name).next()
    }

    /// Returns all values with given name, in order.
    #[inline]
    pub fn get_all<N: AsRef<[u8]>>(&self, name: N) -> GetAll<'_, N> {
        GetAll::new(self.fields.iter(), name)
    }

    /// Returns `true` if at least one pair has given name.
    #[inline]
    pub fn contains(&self, name: impl AsRef<[u8]>) -> bool {
        self.get(name).is_some()
    }

    /// Returns `true` if any comma separated element of any field with given `name` equals
    /// `token`, e.g: `Connection: keep-alive, close` contains `close`.
    pub fn has_token(&self, name: impl AsRef<[u8]>, token: &[u8]) -> bool {
        self.get_all(name).any(|value| {
            value
                .split(|e| *e == b',')
                .any(|e| e.trim_ascii().eq_ignore_ascii_case(token))
        })
    }

    /// Remove all pairs with given name.
    pub fn remove(&mut self, name: impl AsRef<[u8]>) {
        let name = name.as_ref();
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, (Bytes, Bytes)> {
        self.fields.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[(Bytes, Bytes)] {
        &self.fields
    }

    #[inline]
    pub fn into_vec(self) -> Vec<(Bytes, Bytes)> {
        self.fields
    }

    #[inline]
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Returns the first pair that cannot be written on the wire verbatim.
    ///
    /// Name must be a non empty token, value must not contain `CR`, `LF` or `NUL`.
    pub(crate) fn find_invalid(&self) -> Option<&(Bytes, Bytes)> {
        self.fields.iter().find(|(name, value)| {
            name.is_empty()
                || !name.iter().copied().all(is_tchar)
                || value.iter().any(|e| matches!(e, b'\r' | b'\n' | b'\0'))
        })
    }
}

impl From<Vec<(Bytes, Bytes)>> for Headers {
    #[inline]
    fn from(fields: Vec<(Bytes, Bytes)>) -> Self {
        Self { fields }
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<Bytes>,
    V: Into<Bytes>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

impl<N, V> Extend<(N, V)> for Headers
where
    N: Into<Bytes>,
    V: Into<Bytes>,
{
    fn extend<T: IntoIterator<Item = (N, V)>>(&mut self, iter: T) {
        self.fields.extend(iter.into_iter().map(|(n, v)| (n.into(), v.into())));
    }
}

impl IntoIterator for Headers {
    type Item = (Bytes, Bytes);

    type IntoIter = std::vec::IntoIter<(Bytes, Bytes)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a (Bytes, Bytes);

    type IntoIter = std::slice::Iter<'a, (Bytes, Bytes)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl std::fmt::Debug for Headers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.fields {
            map.entry(
                &String::from_utf8_lossy(name),
                &String::from_utf8_lossy(value),
            );
        }
        map.finish()
    }
}
