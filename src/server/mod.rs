mod internal;

pub mod builder;

use crate::{Error, identity::ServerIdentity};
use builder::{AddrOrListener, WantsAddr};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tokio_graceful::Shutdown;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};

pub use builder::RenewalServerBuilder;
pub use internal::{RENEW_PATH, RenewHandler};

/// An mTLS server exposing the renewal endpoint. This must be constructed with a
/// [`RenewalServerBuilder`].
///
/// Clients authenticate with their current certificate and receive a new one for the DNS name it
/// carries. The server's own certificate comes from a [`ServerIdentity`] that renews itself while
/// the server runs.
///
/// # Examples
///
/// ```rust,no_run
/// use private_ca::{certificate_authority::Issuer, credentials::load_roots, RenewalServer};
/// use std::{path::Path, sync::Arc};
///
/// # #[tokio::main]
/// # async fn main() {
/// let issuer = Arc::new(Issuer::load("localhost.ca.pem").unwrap());
/// let client_roots = load_roots(Path::new("root.pem")).unwrap();
///
/// let server = RenewalServer::builder()
///     .with_addr(std::net::SocketAddr::from(([127, 0, 0, 1], 8080)))
///     .with_issuer(issuer)
///     .with_client_roots(client_roots)
///     .with_host("localhost")
///     .build()
///     .expect("Failed to build renewal server");
///
/// let (stop, done) = tokio::sync::oneshot::channel();
///
/// tokio::spawn(server.start(async {
///     done.await.unwrap_or_default();
/// }));
///
/// // Do something else...
///
/// stop.send(()).unwrap();
/// # }
/// ```
pub struct RenewalServer {
    addr_or_listener: AddrOrListener,
    acceptor: TlsAcceptor,
    handler: RenewHandler,
    identity: Arc<ServerIdentity>,
}

impl RenewalServer {
    /// Create a new [`RenewalServerBuilder`].
    pub fn builder() -> RenewalServerBuilder<WantsAddr> {
        RenewalServerBuilder::new()
    }

    /// The server's own TLS identity.
    pub fn identity(&self) -> &Arc<ServerIdentity> {
        &self.identity
    }

    /// Attempts to start the renewal server. Runs until `shutdown_signal` completes, then waits
    /// for open connections and the renewal loop to finish.
    ///
    /// # Errors
    ///
    /// This will return an error if the server is unable to listen on its address.
    pub async fn start<F>(self, shutdown_signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = match self.addr_or_listener {
            AddrOrListener::Addr(addr) => TcpListener::bind(addr).await?,
            AddrOrListener::Listener(listener) => {
                listener.set_nonblocking(true)?;
                TcpListener::from_std(listener)?
            }
        };

        info!(
            addr = %listener.local_addr()?,
            host = %self.identity.host(),
            "Renewal server listening"
        );

        let shutdown = Shutdown::new(shutdown_signal);
        let guard = shutdown.guard_weak();
        self.identity.spawn_renewal(shutdown.guard());

        loop {
            tokio::select! {
                res = listener.accept() => {
                    let (tcp, client_addr) = match res {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let acceptor = self.acceptor.clone();
                    let handler = self.handler.clone();

                    shutdown.spawn_task_fn(move |guard| {
                        internal::serve_connection(acceptor, handler, tcp, client_addr, guard)
                    });
                }
                _ = guard.cancelled() => break,
            }
        }

        info!("Shutting down renewal server");
        shutdown.shutdown().await;

        Ok(())
    }
}
