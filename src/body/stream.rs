use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::Incoming;
use crate::error::Error;
use crate::headers::Headers;

type ReadFuture = Pin<Box<dyn Future<Output = (Incoming, Option<Result<Bytes, Error>>)> + Send>>;

/// [`Incoming`] as a [`Stream`] of body chunks.
///
/// Dropping the stream before it ends closes the underlying connection.
pub struct BodyStream {
    state: State,
}

enum State {
    Idle(Incoming),
    Reading(ReadFuture),
    /// Only observable if a read future panicked.
    Poisoned,
}

impl BodyStream {
    pub(crate) fn new(incoming: Incoming) -> Self {
        Self { state: State::Idle(incoming) }
    }

    /// Returns the trailer fields once the stream ends.
    pub fn trailers(&self) -> Option<&Headers> {
        match &self.state {
            State::Idle(incoming) => incoming.trailers(),
            State::Reading(_) | State::Poisoned => None,
        }
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        loop {
            match std::mem::replace(&mut me.state, State::Poisoned) {
                State::Idle(incoming) if incoming.is_end_stream() => {
                    me.state = State::Idle(incoming);
                    return Poll::Ready(None);
                }
                State::Idle(mut incoming) => {
                    me.state = State::Reading(Box::pin(async move {
                        let result = incoming.read().await;
                        (incoming, result)
                    }));
                }
                State::Reading(mut fut) => match fut.as_mut().poll(cx) {
                    Poll::Ready((incoming, result)) => {
                        me.state = State::Idle(incoming);
                        return Poll::Ready(result);
                    }
                    Poll::Pending => {
                        me.state = State::Reading(fut);
                        return Poll::Pending;
                    }
                },
                State::Poisoned => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.state {
            State::Idle(incoming) if incoming.is_end_stream() => (0, Some(0)),
            _ => (0, None),
        }
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Idle(_) => "idle",
            State::Reading(_) => "reading",
            State::Poisoned => "poisoned",
        };
        f.debug_struct("BodyStream").field("state", &state).finish()
    }
}
