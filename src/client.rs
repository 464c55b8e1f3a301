//! Client side of the renewal protocol.

use crate::{
    Error,
    certificate_authority::PEM_CONTENT_TYPE,
    config::RenewConfig,
    credentials::{load_credential, load_roots, write_owner_read_only},
    server::RENEW_PATH,
};
use http_body_util::{BodyExt, Empty};
use hyper::{Request, Response, StatusCode, Uri, body::Bytes, header::CONTENT_TYPE};
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use std::{
    borrow::Cow,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};
use tokio_rustls::rustls::{self, ClientConfig};
use tracing::{debug, info};

/// Renews the credential at `config.pem` by presenting it to the renewal endpoint at
/// `config.url`, then replaces the file with the returned credential.
///
/// # Errors
///
/// This will return an error if the credential or roots cannot be loaded, the request fails, the
/// response is not a PEM credential, or the credential file cannot be replaced.
pub async fn renew(config: &RenewConfig) -> Result<PathBuf, Error> {
    let (certs, key) = load_credential(&config.pem)?;
    let roots = load_roots(&config.ca)?;

    let tls_config = ClientConfig::builder_with_protocol_versions(&[&rustls::version::TLS13])
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)?;

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_only()
        .enable_http1()
        .build();
    let client = Client::builder(TokioExecutor::new()).build(https);

    let uri = renew_uri(&config.url)?;
    debug!(%uri, "Requesting renewal");

    let req = Request::get(uri)
        .body(Empty::<Bytes>::new())
        .expect("Failed to build request");
    let res = client.request(req).await?;
    check_response(&res)?;

    let body = res.into_body().collect().await?.to_bytes();
    replace_credential(&config.pem, &body)?;

    info!(path = %config.pem.display(), "Renewed credential");
    Ok(config.pem.clone())
}

fn renew_uri(url: &str) -> Result<Uri, Error> {
    let base = url.trim_end_matches('/');
    let uri = format!("{base}{RENEW_PATH}").parse()?;
    Ok(uri)
}

/// Accepts only a successful response carrying exactly one `application/x-pem-file` content type.
pub fn check_response<B>(res: &Response<B>) -> Result<(), Error> {
    if res.status() != StatusCode::OK {
        return Err(Error::UnexpectedStatus(res.status()));
    }

    let content_types = res
        .headers()
        .get_all(CONTENT_TYPE)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .map(Cow::into_owned)
        .collect::<Vec<_>>();

    match content_types.as_slice() {
        [content_type] if content_type == PEM_CONTENT_TYPE => Ok(()),
        _ => Err(Error::UnexpectedContentType(format!("{content_types:?}"))),
    }
}

/// Path of the backup kept for `path` while it is replaced.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(".old");
    PathBuf::from(backup)
}

/// Moves the credential at `path` to its backup path.
pub fn backup_credential(path: &Path) -> std::io::Result<PathBuf> {
    let backup = backup_path(path);
    fs::rename(path, &backup)?;
    Ok(backup)
}

/// Writes a new credential to `path`, readable by its owner only.
pub fn write_credential(path: &Path, credential: &[u8]) -> std::io::Result<()> {
    write_owner_read_only(path, credential)
}

/// Replaces the credential at `path`, keeping the previous one at its backup path.
///
/// The old file is renamed before the new one is written, so an interruption leaves either the
/// old credential under the backup name or the complete new credential under `path`.
pub fn replace_credential(path: &Path, credential: &[u8]) -> Result<(), Error> {
    let backup = backup_credential(path)?;
    debug!(backup = %backup.display(), "Backed up previous credential");
    write_credential(path, credential)?;
    Ok(())
}
