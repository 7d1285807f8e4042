//! The outbound request model.
//!
//! A [`Request`] is an immutable value describing one outbound HTTP request:
//! a method, an absolute URL, an optional body and optional headers. Redirect
//! handling produces a new request sharing everything but the URL, it never
//! mutates an existing one.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

/// An outbound HTTP request.
///
/// Caller-supplied headers are merged over the defaults the client derives
/// (`Host`, `User-Agent`, `Content-Length`, `Connection`), so a header set
/// here with the same name as a derived one replaces it.
///
/// # Example
/// ```
/// # use courier::Request;
/// let request = Request::post("http://example.com/submit".parse().unwrap())
///     .header(http::header::CONTENT_TYPE, "text/plain".parse().unwrap())
///     .body("hello".into());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    uri: Uri,
    body: Bytes,
    headers: HeaderMap,
}

impl Request {
    /// Create a request with the given method and absolute URL, no body and
    /// no caller headers.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            body: Bytes::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Create a GET request for the given URL.
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Create a POST request for the given URL.
    pub fn post(uri: Uri) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Create a PUT request for the given URL.
    pub fn put(uri: Uri) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// Create a PATCH request for the given URL.
    pub fn patch(uri: Uri) -> Self {
        Self::new(Method::PATCH, uri)
    }

    /// Create a DELETE request for the given URL.
    pub fn delete(uri: Uri) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Attach a body to the request.
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Add a caller header, replacing any previous value for the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute request URL.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request body. Empty means no body; `Content-Length: 0` is sent.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Caller-supplied headers, merged over the derived defaults at send time.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Copy of this request with only the URL replaced. Used when re-issuing
    /// a request at a redirect target.
    pub(crate) fn with_uri(&self, uri: Uri) -> Self {
        Self {
            method: self.method.clone(),
            uri,
            body: self.body.clone(),
            headers: self.headers.clone(),
        }
    }
}
