use hyper::StatusCode;
use std::path::PathBuf;
use thiserror::Error;
use tokio_rustls::rustls;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid CA material: {0}")]
    CaMaterial(String),
    #[error("the given certificate is not a CA cert")]
    NotCa,
    #[error("private key does not match the CA certificate")]
    KeyMismatch,
    #[error("invalid certificate: {0}")]
    Certificate(String),
    #[error("certificate generation failed: {0}")]
    Rcgen(#[from] rcgen::Error),
    #[error("invalid validity window: {0}")]
    Validity(#[from] time::error::ComponentRange),
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("invalid client roots: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),
    #[error("no PKCS8 private key found in {0}")]
    MissingPrivateKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("network error: {0}")]
    Network(#[from] hyper::Error),
    #[error("request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),
    #[error("invalid url: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
    #[error("unexpected response status: {0}")]
    UnexpectedStatus(StatusCode),
    #[error("got content-type {0}, want application/x-pem-file")]
    UnexpectedContentType(String),
}
