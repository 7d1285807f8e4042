//! Connection setup for a single request attempt.
//!
//! The [`Connector`] opens the byte stream for one attempt: TCP connect with
//! a bounded timeout, an optional TLS session wrapping the stream when the
//! target scheme is secure, and the HTTP/1.1 handshake that yields a request
//! sender. The connection driver is spawned onto the ambient runtime and
//! lives for the duration of the attempt; with `Connection: Close` semantics
//! it winds down once the response is complete.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{trace, Instrument};

use crate::error::Error;

/// Get a default TLS client configuration by loading the platform's native
/// certificates.
pub fn default_tls_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().expect("could not load platform certs") {
        roots.add(cert).unwrap();
    }

    let mut cfg = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    cfg.alpn_protocols.push(b"http/1.1".to_vec());
    cfg
}

/// Opens the connection for one attempt.
///
/// Cheap to clone; the TLS configuration is shared behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Connector {
    tls: Arc<rustls::ClientConfig>,
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl Connector {
    /// Create a connector with the given TLS configuration and the default
    /// 10 second connect and TLS handshake timeouts.
    pub fn new(tls: Arc<rustls::ClientConfig>) -> Self {
        Self {
            tls,
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Set the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the TLS handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Connect to `host:port`, wrap the stream in TLS when `secure` is set,
    /// and perform the HTTP/1.1 handshake.
    ///
    /// Every failure here, including both timeouts, is a [`Error::Transport`]:
    /// a TLS failure on a secure target fails the attempt outright rather
    /// than downgrading to cleartext.
    pub(crate) async fn connect(
        &self,
        host: &str,
        port: u16,
        secure: bool,
    ) -> Result<http1::SendRequest<Full<Bytes>>, Error> {
        let span = tracing::trace_span!("connect", host = %host, port = port, secure = secure);

        async move {
            let tcp = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
                .await
                .map_err(|elapsed| {
                    Error::transport(io::Error::new(io::ErrorKind::TimedOut, elapsed))
                })?
                .map_err(Error::transport)?;

            if let Ok(peer_addr) = tcp.peer_addr() {
                trace!(peer.addr = %peer_addr, "tcp connected");
            } else {
                trace!("tcp connected");
            }

            let stream = if secure {
                let server_name =
                    ServerName::try_from(host.to_owned()).map_err(Error::transport)?;
                let connector = TlsConnector::from(self.tls.clone());
                let tls = tokio::time::timeout(
                    self.handshake_timeout,
                    connector.connect(server_name, tcp),
                )
                .await
                .map_err(|elapsed| {
                    Error::transport(io::Error::new(io::ErrorKind::TimedOut, elapsed))
                })?
                .map_err(Error::transport)?;
                trace!("tls handshake complete");
                Stream::Tls(Box::new(tls))
            } else {
                Stream::Plain(tcp)
            };

            let (sender, conn) = http1::Builder::new()
                .handshake(TokioIo::new(stream))
                .await
                .map_err(Error::transport)?;

            tokio::spawn(async move {
                if let Err(err) = conn.await {
                    tracing::debug!(%err, "connection driver error");
                }
            });

            Ok(sender)
        }
        .instrument(span)
        .await
    }
}

/// The byte stream for one attempt, with or without a TLS session.
#[derive(Debug)]
enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
