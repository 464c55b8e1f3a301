mod hierarchy;
mod issuer;

use crate::Error;
use rand::Rng;
use rcgen::{KeyIdMethod, SerialNumber};
use std::{fmt, sync::Arc};
use time::{Date, Duration, OffsetDateTime};
use tokio_rustls::rustls::{
    crypto::aws_lc_rs::sign::any_supported_type,
    pki_types::{CertificateDer, PrivateKeyDer},
    sign::CertifiedKey,
};

pub use hierarchy::*;
pub use issuer::*;

/// Validity of end-entity certificates when no override is given, in calendar months.
pub const DEFAULT_VALIDITY_MONTHS: u8 = 3;

/// Length of the random subject key identifier placed in every issued certificate.
pub const SKID_LEN: usize = 20;

/// Content type used for credentials sent over the wire.
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

/// Options applied to a single signing operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SignOptions {
    /// Overrides the default three month validity window.
    pub validity: Option<Duration>,
}

impl SignOptions {
    /// Options with a fixed validity window starting at the time of signing.
    pub fn with_validity(validity: Duration) -> Self {
        Self {
            validity: Some(validity),
        }
    }

    pub(crate) fn window(
        &self,
        now: OffsetDateTime,
    ) -> Result<(OffsetDateTime, OffsetDateTime), Error> {
        let not_after = match self.validity {
            Some(validity) => now + validity,
            None => add_months(now, DEFAULT_VALIDITY_MONTHS)?,
        };
        Ok((now, not_after))
    }
}

/// A freshly issued end-entity credential.
///
/// `pkcs8` holds the `PRIVATE KEY` PEM block of the new key, `chain` holds the leaf certificate
/// followed by the issuing CA certificate.
#[derive(Clone, Eq, PartialEq)]
pub struct EndEntity {
    pub pkcs8: String,
    pub chain: String,
}

impl fmt::Debug for EndEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndEntity")
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl EndEntity {
    /// The credential as it is written to disk and sent by the renewal endpoint.
    pub fn to_pem(&self) -> String {
        let mut pem = String::with_capacity(self.pkcs8.len() + self.chain.len());
        pem.push_str(&self.pkcs8);
        pem.push_str(&self.chain);
        pem
    }

    /// DER encoded certificates of the chain, leaf first.
    pub fn chain_der(&self) -> Result<Vec<CertificateDer<'static>>, Error> {
        let certs = rustls_pemfile::certs(&mut self.chain.as_bytes())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(certs)
    }

    /// Builds the rustls representation of this credential.
    pub fn certified_key(&self) -> Result<CertifiedKey, Error> {
        let key = rustls_pemfile::pkcs8_private_keys(&mut self.pkcs8.as_bytes())
            .next()
            .ok_or_else(|| Error::MissingPrivateKey("issued credential".to_owned()))??;
        let signing_key = any_supported_type(&PrivateKeyDer::Pkcs8(key))?;
        Ok(CertifiedKey::new(self.chain_der()?, signing_key))
    }

    pub(crate) fn into_certified(self) -> Result<(Self, Arc<CertifiedKey>), Error> {
        let certified_key = Arc::new(self.certified_key()?);
        Ok((self, certified_key))
    }
}

/// Random 128-bit serial number.
pub(crate) fn random_serial() -> SerialNumber {
    let bytes: [u8; 16] = rand::rng().random();
    SerialNumber::from_slice(&bytes)
}

/// Random subject key identifier. A random SKID makes it unsafe to sign a second certificate for
/// the same key, so one is generated per signing operation.
pub(crate) fn random_key_id() -> KeyIdMethod {
    let bytes: [u8; SKID_LEN] = rand::rng().random();
    KeyIdMethod::PreSpecified(bytes.to_vec())
}

/// Adds calendar months, carrying day overflow into the following month.
pub(crate) fn add_months(at: OffsetDateTime, months: u8) -> Result<OffsetDateTime, Error> {
    let month_index = at.month() as i32 - 1 + i32::from(months);
    let year = at.year() + month_index / 12;
    let month = at.month().nth_next(months % 12);

    let first = Date::from_calendar_date(year, month, 1)?;
    let date = first + Duration::days(i64::from(at.day()) - 1);
    Ok(at.replace_date(date))
}
