//! Courier
//!
//! A minimal asynchronous HTTP(S) client built on [hyper] and [tokio].
//!
//! Courier executes one request at a time over a fresh connection: it opens
//! TCP (and TLS for `https` URLs), writes an HTTP/1.1 request with
//! `Connection: Close`, accumulates the streamed response, and resolves a
//! future with the completed [`Response`] or a typed [`Error`]. Redirect
//! statuses (301, 302, 307) are followed automatically up to a bounded
//! attempt budget.
//!
//! There are three levels of API:
//!
//! 1. The [`Client`] facade, which owns the worker pool and exposes
//!    [`execute`][Client::execute] plus verb sugar like
//!    [`get`][Client::get].
//! 2. The [`Request`]/[`Response`] model in [`request`] and [`response`].
//! 3. The low-level pieces: the [`conn`] module for connection setup and
//!    the [`accumulate`] module for the response state machine.
//!
//! Out of scope by design: connection pooling and keep-alive, HTTP/2,
//! cookies, response decompression, and retries on transport failure.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod accumulate;
pub mod client;
pub mod conn;
mod error;
mod invoke;
pub mod request;
pub mod response;

pub use client::{Client, Executor, ResponseFuture};
pub use error::Error;
pub use request::Request;
pub use response::Response;
