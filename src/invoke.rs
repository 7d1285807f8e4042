//! Request execution: one network attempt plus bounded redirect following.
//!
//! An [`Invoker`] owns the request, the connector and the remaining attempt
//! budget for one redirect chain. Attempts are strictly sequential; a
//! redirect status re-issues the request at the `location` target with the
//! budget reduced by one, and the chain ends with a non-redirect response,
//! an error, or [`Error::TooManyRedirects`].

use bytes::Bytes;
use http::uri::Uri;
use http::{header, HeaderValue};
use http_body_util::{BodyExt as _, Full};
use hyper::body::Incoming;
use tracing::{debug, trace_span, Instrument};

use crate::accumulate::{Accumulator, Event, Head};
use crate::conn::Connector;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// Initial attempt budget: at most 3 redirect hops are followed before the
/// chain fails.
pub(crate) const DEFAULT_ATTEMPTS: usize = 4;

const USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Redirect statuses that trigger re-issue. Other 3xx codes resolve the
/// caller's future directly.
fn is_redirect(status: http::StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 307)
}

/// The connection target derived from a request URL.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    secure: bool,
    explicit_port: bool,
}

impl Target {
    fn from_uri(uri: &Uri) -> Result<Self, Error> {
        let secure = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            _ => {
                return Err(Error::MalformedUrl(format!(
                    "unsupported scheme in {uri}"
                )))
            }
        };

        let host = uri
            .host()
            .ok_or_else(|| Error::MalformedUrl(format!("missing host in {uri}")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let explicit = uri.port_u16();
        let port = explicit.unwrap_or(if secure { 443 } else { 80 });

        Ok(Self {
            host: host.to_owned(),
            port,
            secure,
            explicit_port: explicit.is_some(),
        })
    }

    fn default_port(&self) -> u16 {
        if self.secure {
            443
        } else {
            80
        }
    }

    /// `host:port` only when the URL carried an explicit non-default port,
    /// bare `host` otherwise. IPv6 literals are re-bracketed for the header
    /// since `host` stores them bare.
    fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.explicit_port && self.port != self.default_port() {
            format!("{host}:{}", self.port)
        } else {
            host
        }
    }
}

/// Build the wire request for one attempt: origin-form request target and
/// the derived default headers, with caller headers merged on top.
fn assemble(request: &Request, target: &Target) -> Result<http::Request<Full<Bytes>>, Error> {
    let path = request
        .uri()
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or_default();
    let origin_form: Uri = if path.is_empty() { "/" } else { path }
        .parse()
        .map_err(|error| Error::MalformedUrl(format!("invalid request target: {error}")))?;

    let mut head = http::Request::new(Full::new(request.body_bytes().clone()));
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = origin_form;

    let headers = head.headers_mut();
    headers.insert(
        header::HOST,
        HeaderValue::try_from(target.host_header())
            .map_err(|error| Error::MalformedUrl(format!("invalid host: {error}")))?,
    );
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(request.body_bytes().len()),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("Close"));

    // Caller headers win over the derived defaults.
    for (name, value) in request.headers() {
        headers.insert(name, value.clone());
    }

    Ok(head)
}

/// Drain one attempt's framed response events through the [`Accumulator`].
async fn accumulate(response: http::Response<Incoming>) -> Result<Response, Error> {
    let mut accumulator = Accumulator::new();
    let (parts, mut body) = response.into_parts();

    accumulator.advance(Event::Head(Head {
        status: parts.status,
        headers: parts.headers,
    }))?;

    let mut trailers = None;
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(Error::transport)?;
        match frame.into_data() {
            Ok(chunk) => {
                accumulator.advance(Event::Body(chunk))?;
            }
            Err(frame) => {
                if let Ok(block) = frame.into_trailers() {
                    trailers = Some(block);
                }
            }
        }
    }

    accumulator
        .advance(Event::End(trailers))?
        .ok_or_else(|| Error::MalformedHead("response ended without a head".into()))
}

/// Executes a redirect chain for one request.
#[derive(Debug)]
pub(crate) struct Invoker {
    request: Request,
    connector: Connector,
    remaining_attempts: usize,
}

impl Invoker {
    pub(crate) fn new(request: Request, connector: Connector, attempts: usize) -> Self {
        Self {
            request,
            connector,
            remaining_attempts: attempts.max(1),
        }
    }

    /// Run attempts until a non-redirect response, an error, or an exhausted
    /// budget. Attempts never overlap: the next one starts only once the
    /// previous response is known.
    pub(crate) async fn run(mut self) -> Result<Response, Error> {
        loop {
            let target = Target::from_uri(self.request.uri())?;
            let span = trace_span!(
                "attempt",
                host = %target.host,
                port = target.port,
                remaining = self.remaining_attempts,
            );
            let response = self.attempt(&target).instrument(span).await?;

            if !is_redirect(response.status()) {
                return Ok(response);
            }

            if self.remaining_attempts <= 1 {
                return Err(Error::TooManyRedirects);
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .ok_or_else(|| {
                    Error::MalformedUrl("redirect response without a location header".into())
                })?
                .to_str()
                .map_err(|error| Error::MalformedUrl(format!("invalid location: {error}")))?;
            let uri: Uri = location.parse().map_err(|error| {
                Error::MalformedUrl(format!("invalid location {location:?}: {error}"))
            })?;

            debug!(status = %response.status(), location = %uri, "following redirect");
            self.request = self.request.with_uri(uri);
            self.remaining_attempts -= 1;
        }
    }

    /// One connect, write, accumulate cycle.
    async fn attempt(&self, target: &Target) -> Result<Response, Error> {
        let mut sender = self
            .connector
            .connect(&target.host, target.port, target.secure)
            .await?;

        let head = assemble(&self.request, target)?;
        sender.ready().await.map_err(Error::transport)?;
        let response = sender.send_request(head).await.map_err(Error::transport)?;

        accumulate(response).await
    }
}
