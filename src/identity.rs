use crate::{
    Error,
    certificate_authority::{EndEntity, Issuer, SignOptions},
};
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tokio::{task::JoinHandle, time::Instant};
use tokio_graceful::ShutdownGuard;
use tokio_rustls::rustls::{
    server::{ClientHello, ResolvesServerCert},
    sign::CertifiedKey,
};
use tracing::{error, info};

/// Validity of the server's own certificate.
pub const SERVER_CERT_VALIDITY: time::Duration = time::Duration::hours(24);

/// Interval between renewals of the server's own certificate. Two renewals fit in one validity
/// window, so a single failed attempt never lets the certificate expire.
pub const RENEWAL_INTERVAL: Duration = Duration::from_secs(11 * 60 * 60);

/// One issued server credential, both as PEM and as parsed by rustls.
pub struct ServerCredential {
    pub end_entity: EndEntity,
    pub certified_key: Arc<CertifiedKey>,
}

impl fmt::Debug for ServerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCredential")
            .field("end_entity", &self.end_entity)
            .finish_non_exhaustive()
    }
}

/// A server TLS identity that keeps itself renewed through an [`Issuer`].
///
/// Handshakes read the active credential through [`ResolvesServerCert`]. Renewal signs and parses
/// the new credential first and then replaces the active snapshot in one step, so a handshake
/// always sees a matching certificate and key.
pub struct ServerIdentity {
    host: String,
    issuer: Arc<Issuer>,
    current: RwLock<Arc<ServerCredential>>,
}

impl ServerIdentity {
    /// Signs the initial credential for `host`.
    ///
    /// # Errors
    ///
    /// This will return an error if the initial credential cannot be issued.
    pub fn new(host: impl Into<String>, issuer: Arc<Issuer>) -> Result<Self, Error> {
        let host = host.into();
        let credential = sign(&host, &issuer)?;

        Ok(Self {
            host,
            issuer,
            current: RwLock::new(Arc::new(credential)),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The active credential.
    pub fn current(&self) -> Arc<ServerCredential> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Issues a new credential and makes it active.
    ///
    /// # Errors
    ///
    /// This will return an error if signing fails, in which case the active credential is kept.
    pub fn renew(&self) -> Result<(), Error> {
        let credential = Arc::new(sign(&self.host, &self.issuer)?);

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = credential;
        Ok(())
    }

    fn renew_logged(&self) {
        match self.renew() {
            Ok(()) => info!(host = %self.host, "Renewed server certificate"),
            Err(e) => error!(host = %self.host, "Failed to renew server certificate: {}", e),
        }
    }

    /// Spawns the renewal loop, which renews every [`RENEWAL_INTERVAL`] until `guard` is
    /// cancelled.
    pub fn spawn_renewal(self: &Arc<Self>, guard: ShutdownGuard) -> JoinHandle<()> {
        let identity = Arc::clone(self);

        tokio::spawn(async move {
            let start = Instant::now() + RENEWAL_INTERVAL;
            let mut interval = tokio::time::interval_at(start, RENEWAL_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval.tick() => identity.renew_logged(),
                    _ = guard.cancelled() => break,
                }
            }
        })
    }
}

impl fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("host", &self.host)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl ResolvesServerCert for ServerIdentity {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.current().certified_key))
    }
}

fn sign(host: &str, issuer: &Issuer) -> Result<ServerCredential, Error> {
    let (end_entity, certified_key) = issuer
        .sign(host, &SignOptions::with_validity(SERVER_CERT_VALIDITY))?
        .into_certified()?;

    Ok(ServerCredential {
        end_entity,
        certified_key,
    })
}
