//! The completed response model.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A completed HTTP response.
///
/// Produced exactly once per connection attempt by the
/// [`Accumulator`][crate::accumulate::Accumulator] after the transport
/// delivers the end-of-response event. Header names are lower-cased
/// ([`HeaderMap`] stores them that way), so lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub(crate) fn from_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The accumulated response body. Empty when the server sent none.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }
}
