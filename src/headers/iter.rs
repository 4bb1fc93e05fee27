use bytes::Bytes;

/// Iterator over values of the same header name, returned from [`Headers::get_all`].
///
/// [`Headers::get_all`]: super::Headers::get_all
#[derive(Debug)]
pub struct GetAll<'a, N> {
    iter: std::slice::Iter<'a, (Bytes, Bytes)>,
    name: N,
}

impl<'a, N> GetAll<'a, N> {
    pub(crate) fn new(iter: std::slice::Iter<'a, (Bytes, Bytes)>, name: N) -> Self {
        Self { iter, name }
    }
}

impl<'a, N: AsRef<[u8]>> Iterator for GetAll<'a, N> {
    type Item = &'a Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.name.as_ref();
        self.iter
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.iter.size_hint().1)
    }
}
