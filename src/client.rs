//! The client facade and its execution context.
//!
//! A [`Client`] owns (or shares) an [`Executor`], the worker pool driving
//! all connection I/O, and exposes [`execute`][Client::execute] as the single
//! entry point for sending a request. Requests spawned by one client
//! multiplex over the shared pool; the pool is released by an explicit,
//! best-effort [`shutdown`][Client::shutdown].

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::conn::{default_tls_config, Connector};
use crate::error::Error;
use crate::invoke::{Invoker, DEFAULT_ATTEMPTS};
use crate::request::Request;
use crate::response::Response;

/// The worker pool driving connection I/O.
///
/// Sized to the available hardware concurrency by default. One executor can
/// be shared by several clients so their connections multiplex over the same
/// workers; construct it once and pass it to each
/// [`Builder::executor`] call.
pub struct Executor {
    runtime: Option<tokio::runtime::Runtime>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").finish()
    }
}

impl Executor {
    /// Build an executor sized to the available hardware concurrency.
    pub fn new() -> io::Result<Self> {
        let workers = std::thread::available_parallelism().map_or(1, usize::from);
        Self::with_workers(workers)
    }

    /// Build an executor with an explicit worker count.
    pub fn with_workers(workers: usize) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name("courier-worker")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime
            .as_ref()
            .expect("executor is only torn down on drop")
            .spawn(future)
    }

    fn shutdown(mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // shutdown_background is safe even when the executor is dropped from
        // inside another runtime, where a blocking drop would panic.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Configures and builds a [`Client`].
#[derive(Debug, Default)]
pub struct Builder {
    executor: Option<Arc<Executor>>,
    tls: Option<Arc<rustls::ClientConfig>>,
    connect_timeout: Option<Duration>,
    handshake_timeout: Option<Duration>,
    max_attempts: Option<usize>,
}

impl Builder {
    /// Share an existing executor instead of building an owned one.
    pub fn executor(mut self, executor: Arc<Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use a specific TLS client configuration. Defaults to the platform's
    /// native root certificates.
    pub fn tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// Set the TCP connect timeout. Defaults to 10 seconds.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the TLS handshake timeout. Defaults to 10 seconds.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Set the attempt budget per request. The default of 4 follows at most
    /// 3 redirect hops before failing with [`Error::TooManyRedirects`].
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Build the client. Fails only when an owned executor cannot spawn its
    /// worker threads.
    pub fn build(self) -> io::Result<Client> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(Executor::new()?),
        };

        let tls = self
            .tls
            .unwrap_or_else(|| Arc::new(default_tls_config()));
        let mut connector = Connector::new(tls);
        if let Some(timeout) = self.connect_timeout {
            connector = connector.with_connect_timeout(timeout);
        }
        if let Some(timeout) = self.handshake_timeout {
            connector = connector.with_handshake_timeout(timeout);
        }

        Ok(Client {
            executor,
            connector,
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_ATTEMPTS),
        })
    }
}

/// A minimal asynchronous HTTP(S) client.
///
/// # Example
/// ```no_run
/// # use courier::{Client, Request};
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder().build()?;
/// let response = client
///     .execute(Request::get("http://example.com/".parse()?))
///     .await?;
/// println!("{}", response.status());
/// client.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    executor: Arc<Executor>,
    connector: Connector,
    max_attempts: usize,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish()
    }
}

impl Client {
    /// Create a new, empty builder for clients.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Send a request, returning a future of the completed response.
    ///
    /// The attempt chain runs as a task on the executor, so callers may
    /// await the returned future from any async context (or block on it from
    /// a synchronous one). Redirects are followed automatically, see
    /// [`Builder::max_attempts`].
    pub fn execute(&self, request: Request) -> ResponseFuture {
        let invoker = Invoker::new(request, self.connector.clone(), self.max_attempts);
        ResponseFuture {
            handle: self.executor.spawn(invoker.run()),
        }
    }

    /// Make a GET request to the given URI.
    pub async fn get(&self, uri: http::Uri) -> Result<Response, Error> {
        self.execute(Request::get(uri)).await
    }

    /// Release the worker pool, best-effort.
    ///
    /// When the executor is shared with other clients the pool stays alive
    /// for them and this call does nothing.
    pub fn shutdown(self) {
        if let Some(executor) = Arc::into_inner(self.executor) {
            executor.shutdown();
        }
    }
}

/// Future resolving to the completed response for one executed request.
///
/// Dropping the future detaches the in-flight request; it does not cancel
/// work already handed to the executor.
#[pin_project::pin_project]
#[derive(Debug)]
pub struct ResponseFuture {
    #[pin]
    handle: JoinHandle<Result<Response, Error>>,
}

impl Future for ResponseFuture {
    type Output = Result<Response, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().handle.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join)) => Poll::Ready(Err(Error::transport(join))),
            Poll::Pending => Poll::Pending,
        }
    }
}
