use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Client error type.
///
/// Every failure on the request path resolves the caller's future with one of
/// these variants; there is no local recovery. A TLS setup failure on a
/// `https` request is fatal for that attempt and surfaces as [`Error::Transport`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The response head was missing, unparseable, or delivered out of order.
    #[error("malformed head: {0}")]
    MalformedHead(String),

    /// The response body violated HTTP/1.1 framing for this attempt.
    #[error("malformed body: {0}")]
    MalformedBody(String),

    /// The request URL or a redirect target could not be parsed, or lacked a
    /// supported scheme or a host.
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    /// The redirect budget was exhausted before a non-redirect response arrived.
    #[error("too many redirects")]
    TooManyRedirects,

    /// Error occured with the underlying transport: DNS, TCP connect (or its
    /// timeout), TLS negotiation, socket I/O, or the connection driver.
    #[error("transport: {0}")]
    Transport(#[source] BoxError),
}

impl Error {
    pub(crate) fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(error.into())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(Error: std::error::Error, Send, Sync, Into<BoxError>);
}
