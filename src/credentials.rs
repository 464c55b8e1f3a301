//! Reading and writing PEM encoded credentials and trust roots.

use crate::Error;
use pem::{EncodeConfig, LineEnding, Pem};
use std::{fs, io::Write, path::Path};
use tokio_rustls::rustls::{
    RootCertStore,
    pki_types::{CertificateDer, PrivateKeyDer},
};

/// Encodes DER bytes as a single PEM block with `\n` line endings.
pub(crate) fn encode_pem(tag: &str, der: &[u8]) -> String {
    pem::encode_config(
        &Pem::new(tag, der.to_vec()),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    )
}

/// Reads every certificate in a PEM file.
///
/// # Errors
///
/// This will return an error if the file cannot be read or holds no certificates.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let pem = fs::read(path)?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(Error::NoCertificates(path.to_owned()));
    }
    Ok(certs)
}

/// Builds a trust store from the certificates in a PEM file.
///
/// # Errors
///
/// This will return an error if the file cannot be read or none of its certificates can be used
/// as a trust anchor.
pub fn load_roots(path: &Path) -> Result<RootCertStore, Error> {
    let mut roots = RootCertStore::empty();
    let (added, _ignored) = roots.add_parsable_certificates(load_certs(path)?);
    if added == 0 {
        return Err(Error::NoCertificates(path.to_owned()));
    }
    Ok(roots)
}

/// Reads a credential file holding a private key and its certificate chain.
///
/// # Errors
///
/// This will return an error if the file cannot be read or is missing either part.
pub fn load_credential(
    path: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), Error> {
    let pem = fs::read(path)?;
    let key = rustls_pemfile::private_key(&mut pem.as_slice())?
        .ok_or_else(|| Error::MissingPrivateKey(path.display().to_string()))?;
    let certs = load_certs(path)?;
    Ok((certs, key))
}

/// Creates `path` with mode `0400` and writes `contents` to it.
///
/// An existing file is truncated.
pub fn write_owner_read_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o400);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
