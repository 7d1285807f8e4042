use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use courier::{Client, Error, Request};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn tls_server_config() -> ServerConfig {
    let (_, cert) = pem_rfc7468::decode_vec(include_bytes!("minica/localhost/cert.pem")).unwrap();
    let (label, key) =
        pem_rfc7468::decode_vec(include_bytes!("minica/localhost/key.pem")).unwrap();

    let cert = rustls::pki_types::CertificateDer::from(cert);
    let key = match label {
        "PRIVATE KEY" => rustls::pki_types::PrivateKeyDer::Pkcs8(key.into()),
        "RSA PRIVATE KEY" => rustls::pki_types::PrivateKeyDer::Pkcs1(key.into()),
        "EC PRIVATE KEY" => rustls::pki_types::PrivateKeyDer::Sec1(key.into()),
        _ => panic!("unknown key type"),
    };

    let mut cfg = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .unwrap();

    cfg.alpn_protocols.push(b"http/1.1".to_vec());
    cfg
}

fn tls_root_store() -> rustls::RootCertStore {
    let mut root_store = rustls::RootCertStore::empty();
    let (_, cert) = pem_rfc7468::decode_vec(include_bytes!("minica/minica.pem")).unwrap();
    root_store
        .add(rustls::pki_types::CertificateDer::from(cert))
        .unwrap();
    root_store
}

fn tls_client_config() -> rustls::ClientConfig {
    let mut config = rustls::ClientConfig::builder()
        .with_root_certificates(tls_root_store())
        .with_no_client_auth();
    config.alpn_protocols.push(b"http/1.1".to_vec());
    config
}

/// Serve HTTP/1.1 over TLS until the task is aborted.
fn serve_tls(listener: TcpListener) -> tokio::task::JoinHandle<()> {
    let acceptor = TlsAcceptor::from(Arc::new(tls_server_config()));

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(stream) = acceptor.accept(stream).await else {
                    return;
                };
                let service = service_fn(|request: http::Request<hyper::body::Incoming>| async move {
                    http::Response::builder()
                        .header("Echo-Path", request.uri().path())
                        .header("Echo-Method", request.method().as_str())
                        .body(Full::new(Bytes::from_static(b"secure")))
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    })
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn https_round_trip() -> Result<(), BoxError> {
    let _ = tracing_subscriber::fmt::try_init();

    let (listener, addr) = bind().await;
    let server = serve_tls(listener);

    let client = Client::builder()
        .tls_config(Arc::new(tls_client_config()))
        .build()?;
    let response = client
        .execute(Request::get(
            format!("https://localhost:{}/", addr.port()).parse()?,
        ))
        .await?;
    client.shutdown();
    server.abort();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"secure");

    Ok(())
}

#[tokio::test]
async fn redirect_from_http_upgrades_to_tls() -> Result<(), BoxError> {
    let _ = tracing_subscriber::fmt::try_init();

    let (tls_listener, tls_addr) = bind().await;
    let tls_server = serve_tls(tls_listener);

    let (plain_listener, plain_addr) = bind().await;
    let location = format!("https://localhost:{}/new", tls_addr.port());
    let plain_server = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = plain_listener.accept().await else {
                break;
            };
            let location = location.clone();
            tokio::spawn(async move {
                let service = service_fn(move |_request| {
                    let location = location.clone();
                    async move {
                        http::Response::builder()
                            .status(StatusCode::MOVED_PERMANENTLY)
                            .header(http::header::LOCATION, location)
                            .body(Full::new(Bytes::new()))
                    }
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    let client = Client::builder()
        .tls_config(Arc::new(tls_client_config()))
        .build()?;
    let response = client
        .execute(Request::post(
            format!("http://{plain_addr}/").parse()?,
        ))
        .await?;
    client.shutdown();
    tls_server.abort();
    plain_server.abort();

    // The second attempt reached the TLS server at the rewritten URL with
    // the original method.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"secure");
    assert_eq!(response.headers().get("echo-path").unwrap(), "/new");
    assert_eq!(response.headers().get("echo-method").unwrap(), "POST");

    Ok(())
}

#[tokio::test]
async fn untrusted_certificate_is_a_transport_error() -> Result<(), BoxError> {
    let _ = tracing_subscriber::fmt::try_init();

    let (listener, addr) = bind().await;
    let server = serve_tls(listener);

    // A client with no roots cannot verify the test certificate.
    let client = Client::builder()
        .tls_config(Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(rustls::RootCertStore::empty())
                .with_no_client_auth(),
        ))
        .build()?;
    let error = client
        .execute(Request::get(
            format!("https://localhost:{}/", addr.port()).parse()?,
        ))
        .await
        .expect_err("verification against an empty root store must fail");
    client.shutdown();
    server.abort();

    assert!(matches!(error, Error::Transport(_)));

    Ok(())
}
