//! Streaming response accumulation.
//!
//! One [`Accumulator`] is bound to a single connection attempt. The transport
//! delivers the inbound side of the connection as an ordered sequence of
//! framed [`Event`]s: the response head, zero or more body chunks, then the
//! end of the response. The accumulator is an explicit two-state machine over
//! that sequence and produces exactly one [`Response`]; any out-of-order
//! event fails the attempt rather than assembling a response from a
//! malformed exchange.

use std::mem;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};

use crate::error::Error;
use crate::response::Response;

/// The response head, delivered before any body bytes.
#[derive(Debug, Clone)]
pub struct Head {
    /// Status code from the response status line.
    pub status: StatusCode,

    /// Response headers, names lower-cased.
    pub headers: HeaderMap,
}

/// One framed protocol event for a connection attempt.
#[derive(Debug)]
pub enum Event {
    /// The response head. Valid exactly once, before any body data.
    Head(Head),

    /// One chunk of body data. Chunks are concatenated in arrival order.
    Body(Bytes),

    /// End of the response, with optional trailing headers. This client does
    /// not negotiate trailers, so a non-empty trailer block fails the attempt.
    End(Option<HeaderMap>),
}

#[derive(Debug)]
enum State {
    Ready,
    ParsingBody {
        head: Head,
        body: Option<BytesMut>,
    },
}

/// Assembles framed protocol events into a single [`Response`].
#[derive(Debug)]
pub struct Accumulator {
    state: State,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    /// Create an accumulator ready to receive a response head.
    pub fn new() -> Self {
        Self {
            state: State::Ready,
        }
    }

    /// Feed one event into the state machine.
    ///
    /// Returns `Ok(Some(response))` when [`Event::End`] completes the
    /// response (the machine resets to ready), `Ok(None)` when more events
    /// are expected, and an error when the event is invalid in the current
    /// state. After an error the attempt is unusable and should be failed.
    pub fn advance(&mut self, event: Event) -> Result<Option<Response>, Error> {
        match (mem::replace(&mut self.state, State::Ready), event) {
            (State::Ready, Event::Head(head)) => {
                tracing::trace!(status = %head.status, "response head received");
                self.state = State::ParsingBody { head, body: None };
                Ok(None)
            }
            (State::Ready, Event::Body(_)) => Err(Error::MalformedBody(
                "body chunk received before the response head".into(),
            )),
            (State::Ready, Event::End(_)) => Err(Error::MalformedBody(
                "end of response received before the response head".into(),
            )),
            (State::ParsingBody { .. }, Event::Head(_)) => Err(Error::MalformedHead(
                "second response head received on one attempt".into(),
            )),
            (State::ParsingBody { head, body }, Event::Body(chunk)) => {
                let mut buffer = body.unwrap_or_default();
                buffer.extend_from_slice(&chunk);
                self.state = State::ParsingBody {
                    head,
                    body: Some(buffer),
                };
                Ok(None)
            }
            (State::ParsingBody { head, body }, Event::End(trailers)) => {
                if trailers.is_some_and(|trailers| !trailers.is_empty()) {
                    return Err(Error::MalformedBody(
                        "unexpected trailing headers after the response body".into(),
                    ));
                }

                let body = body.map(BytesMut::freeze).unwrap_or_default();
                tracing::trace!(status = %head.status, len = body.len(), "response complete");
                Ok(Some(Response::from_parts(head.status, head.headers, body)))
            }
        }
    }
}
