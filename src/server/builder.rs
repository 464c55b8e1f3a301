use crate::{
    Error,
    certificate_authority::Issuer,
    identity::ServerIdentity,
    server::{RenewalServer, internal::RenewHandler},
};
use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{self, RootCertStore, ServerConfig, server::WebPkiClientVerifier},
};

/// A builder for creating a renewal server.
#[derive(Debug)]
pub struct RenewalServerBuilder<T>(T);

/// Builder state that needs either an address or a TCP listener.
#[derive(Debug)]
pub struct WantsAddr(());

#[derive(Debug)]
pub(crate) enum AddrOrListener {
    Addr(SocketAddr),
    Listener(TcpListener),
}

impl RenewalServerBuilder<WantsAddr> {
    /// Create a new RenewalServerBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to listen on.
    pub fn with_addr(self, addr: SocketAddr) -> RenewalServerBuilder<WantsIssuer> {
        RenewalServerBuilder(WantsIssuer {
            addr_or_listener: AddrOrListener::Addr(addr),
        })
    }

    /// Set a listener to use for the renewal server.
    pub fn with_listener(self, listener: TcpListener) -> RenewalServerBuilder<WantsIssuer> {
        RenewalServerBuilder(WantsIssuer {
            addr_or_listener: AddrOrListener::Listener(listener),
        })
    }
}

impl Default for RenewalServerBuilder<WantsAddr> {
    fn default() -> Self {
        RenewalServerBuilder(WantsAddr(()))
    }
}

/// Builder state that needs an issuer.
#[derive(Debug)]
pub struct WantsIssuer {
    addr_or_listener: AddrOrListener,
}

impl RenewalServerBuilder<WantsIssuer> {
    /// Set the issuer that signs both renewed client credentials and the server's own identity.
    pub fn with_issuer(self, issuer: Arc<Issuer>) -> RenewalServerBuilder<WantsClientRoots> {
        RenewalServerBuilder(WantsClientRoots {
            addr_or_listener: self.0.addr_or_listener,
            issuer,
        })
    }
}

/// Builder state that needs the roots client certificates are verified against.
#[derive(Debug)]
pub struct WantsClientRoots {
    addr_or_listener: AddrOrListener,
    issuer: Arc<Issuer>,
}

impl RenewalServerBuilder<WantsClientRoots> {
    /// Set the trust roots for client certificates.
    pub fn with_client_roots(self, client_roots: RootCertStore) -> RenewalServerBuilder<WantsHost> {
        RenewalServerBuilder(WantsHost {
            addr_or_listener: self.0.addr_or_listener,
            issuer: self.0.issuer,
            client_roots,
        })
    }
}

/// Builder state that needs the server's own hostname.
#[derive(Debug)]
pub struct WantsHost {
    addr_or_listener: AddrOrListener,
    issuer: Arc<Issuer>,
    client_roots: RootCertStore,
}

impl RenewalServerBuilder<WantsHost> {
    /// Set the hostname placed in the server's own certificate.
    pub fn with_host(self, host: impl Into<String>) -> RenewalServerBuilder<Ready> {
        RenewalServerBuilder(Ready {
            addr_or_listener: self.0.addr_or_listener,
            issuer: self.0.issuer,
            client_roots: self.0.client_roots,
            host: host.into(),
        })
    }
}

/// Builder state that can build the server.
#[derive(Debug)]
pub struct Ready {
    addr_or_listener: AddrOrListener,
    issuer: Arc<Issuer>,
    client_roots: RootCertStore,
    host: String,
}

impl RenewalServerBuilder<Ready> {
    /// Build the renewal server.
    ///
    /// # Errors
    ///
    /// This will return an error if the server's initial certificate cannot be issued or the
    /// client roots cannot be used for verification.
    pub fn build(self) -> Result<RenewalServer, Error> {
        let Ready {
            addr_or_listener,
            issuer,
            client_roots,
            host,
        } = self.0;

        let identity = Arc::new(ServerIdentity::new(host, Arc::clone(&issuer))?);
        let client_roots = Arc::new(client_roots);
        let verifier = WebPkiClientVerifier::builder(client_roots).build()?;

        let mut server_config =
            ServerConfig::builder_with_protocol_versions(&[&rustls::version::TLS13])
                .with_client_cert_verifier(verifier)
                .with_cert_resolver(identity.clone());
        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(RenewalServer {
            addr_or_listener,
            acceptor: TlsAcceptor::from(Arc::new(server_config)),
            handler: RenewHandler::new(issuer),
            identity,
        })
    }
}
