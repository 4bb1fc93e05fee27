use std::task::Poll;

/// Result of an incremental parser working on a partially received buffer.
#[derive(Debug)]
pub enum ParseResult<T, E> {
    /// Bytes is not sufficient for parsing, more IO read is required.
    Pending,
    /// Parse success.
    Ok(T),
    /// Parse failed.
    Err(E),
}

impl<T, E> ParseResult<T, E> {
    /// Returns `true` if the parse result is [`Pending`].
    ///
    /// [`Pending`]: ParseResult::Pending
    #[inline]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` if the parse result is [`Err`].
    ///
    /// [`Err`]: ParseResult::Err
    #[inline]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(..))
    }

    /// Maps the success value, leaving `Pending` and `Err` untouched.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParseResult<U, E> {
        match self {
            ParseResult::Pending => ParseResult::Pending,
            ParseResult::Ok(ok) => ParseResult::Ok(f(ok)),
            ParseResult::Err(err) => ParseResult::Err(err),
        }
    }

    /// Convert to [`Poll<Result<T, E>>`].
    #[inline]
    pub fn into_poll_result(self) -> Poll<Result<T, E>> {
        match self {
            ParseResult::Pending => Poll::Pending,
            ParseResult::Ok(ok) => Poll::Ready(Ok(ok)),
            ParseResult::Err(err) => Poll::Ready(Err(err)),
        }
    }
}

/// Unwrap [`ParseResult::Ok`], otherwise return early with the `Pending` or `Err`.
macro_rules! ready {
    ($e:expr) => {
        match $e {
            $crate::common::ParseResult::Ok(ok) => ok,
            $crate::common::ParseResult::Pending => return $crate::common::ParseResult::Pending,
            $crate::common::ParseResult::Err(err) => return $crate::common::ParseResult::Err(err),
        }
    };
}

pub(crate) use ready;

#[cfg(test)]
pub(crate) mod mock;
