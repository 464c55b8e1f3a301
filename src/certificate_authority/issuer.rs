use crate::{
    Error,
    certificate_authority::{EndEntity, SignOptions, random_key_id, random_serial},
    credentials::encode_pem,
};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256, SanType,
};
use rustls_pemfile::Item;
use std::{fmt, path::Path};
use time::OffsetDateTime;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer};
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Signs short-lived end-entity certificates with a loaded CA certificate and key.
///
/// The CA material is read once and never modified afterwards, so a single issuer can be shared
/// between tasks and used for concurrent signing.
///
/// # Examples
///
/// ```rust,no_run
/// use private_ca::certificate_authority::{Issuer, SignOptions};
///
/// let issuer = Issuer::load("localhost.ca.pem").expect("Failed to load CA");
/// let end_entity = issuer
///     .sign("host.localhost", &SignOptions::default())
///     .expect("Failed to sign certificate");
///
/// print!("{}", end_entity.to_pem());
/// ```
pub struct Issuer {
    ca_cert: rcgen::Certificate,
    ca_key: KeyPair,
    ca_pem: String,
    subject: String,
}

impl Issuer {
    /// Reads CA material from a file. See [`Issuer::from_pem`].
    ///
    /// # Errors
    ///
    /// This will return an error if the file cannot be read or does not hold valid CA material.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    /// Parses CA material holding exactly one `CERTIFICATE` block and exactly one `PRIVATE KEY`
    /// block, in any order. Blocks of other types are ignored.
    ///
    /// # Errors
    ///
    /// This will return an error if either block is missing or repeated, or if the certificate is
    /// not a CA certificate for the key.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let mut cert = None;
        let mut key = None;

        for item in rustls_pemfile::read_all(&mut pem.as_bytes()) {
            match item? {
                Item::X509Certificate(der) => {
                    if cert.replace(der).is_some() {
                        return Err(duplicate_block("CERTIFICATE"));
                    }
                }
                Item::Pkcs8Key(der) => {
                    if key.replace(der).is_some() {
                        return Err(duplicate_block("PRIVATE KEY"));
                    }
                }
                _ => {}
            }
        }

        let cert = cert.ok_or_else(|| missing_block("CERTIFICATE"))?;
        let key = key.ok_or_else(|| missing_block("PRIVATE KEY"))?;

        Self::from_der(cert, key)
    }

    /// Creates an issuer from a DER encoded CA certificate and its PKCS8 private key.
    ///
    /// # Errors
    ///
    /// This will return an error if the certificate does not parse, lacks the CA basic
    /// constraint, or does not belong to the key.
    pub fn from_der(
        ca_cert: CertificateDer<'static>,
        ca_key: PrivatePkcs8KeyDer<'static>,
    ) -> Result<Self, Error> {
        let (_, parsed) = X509Certificate::from_der(&ca_cert)
            .map_err(|e| Error::Certificate(e.to_string()))?;

        let is_ca = parsed
            .basic_constraints()
            .map_err(|e| Error::Certificate(e.to_string()))?
            .is_some_and(|constraints| constraints.value.ca);
        if !is_ca {
            return Err(Error::NotCa);
        }

        let ca_key = KeyPair::try_from(ca_key.secret_pkcs8_der())?;
        let ca_public_key = &parsed.public_key().subject_public_key.data;
        if ca_key.public_key_raw() != &**ca_public_key {
            return Err(Error::KeyMismatch);
        }

        let subject = parsed.subject().to_string();
        let params = CertificateParams::from_ca_cert_der(&ca_cert)?;
        let ca_pem = encode_pem("CERTIFICATE", &ca_cert);

        // Only the issuer name and key identifier of this certificate are used when signing, the
        // chain always carries the original encoding.
        let ca_cert = params.self_signed(&ca_key)?;

        Ok(Self {
            ca_cert,
            ca_key,
            ca_pem,
            subject,
        })
    }

    /// PEM encoding of the CA certificate, exactly as it is appended to issued chains.
    pub fn ca_cert_pem(&self) -> &str {
        &self.ca_pem
    }

    /// Generates a new P-256 key pair and signs a certificate for `host` with it.
    ///
    /// # Errors
    ///
    /// This will return an error if `host` is not a valid DNS name or if key generation or
    /// signing fails.
    pub fn sign(&self, host: &str, options: &SignOptions) -> Result<EndEntity, Error> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let params = end_entity_params(host, options)?;
        let not_after = params.not_after;
        let cert = params.signed_by(&key_pair, &self.ca_cert, &self.ca_key)?;

        debug!(host, not_after = %not_after, "Signed end-entity certificate");

        let mut chain = cert.pem();
        chain.push_str(&self.ca_pem);

        Ok(EndEntity {
            pkcs8: key_pair.serialize_pem(),
            chain,
        })
    }
}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issuer")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

fn duplicate_block(tag: &str) -> Error {
    Error::CaMaterial(format!("more than one {tag} block"))
}

fn missing_block(tag: &str) -> Error {
    Error::CaMaterial(format!("missing {tag} block"))
}

fn end_entity_params(host: &str, options: &SignOptions) -> Result<CertificateParams, Error> {
    let mut params = CertificateParams::default();
    params.serial_number = Some(random_serial());

    let (not_before, not_after) = options.window(OffsetDateTime::now_utc())?;
    params.not_before = not_before;
    params.not_after = not_after;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, host);
    params.distinguished_name = distinguished_name;
    params.subject_alt_names = vec![SanType::DnsName(host.try_into()?)];

    // Only non-CA certificates marked explicitly carry a subject key identifier.
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];

    params.key_identifier_method = random_key_id();
    params.use_authority_key_identifier_extension = true;

    Ok(params)
}
