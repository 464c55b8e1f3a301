use private_ca::{
    RenewalServer,
    certificate_authority::{Hierarchy, Issuer, SignOptions},
    config::RenewConfig,
    credentials::{load_roots, write_owner_read_only},
};
use std::{
    net::{SocketAddr, TcpListener},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use tokio::sync::oneshot::Sender;

pub const SERVER_HOST: &str = "localhost";
pub const CLIENT_HOST: &str = "client.localhost";

/// A CA hierarchy written to a scratch directory.
pub struct Pki {
    pub dir: TempDir,
    pub root: PathBuf,
    pub issuer: Arc<Issuer>,
}

impl Pki {
    pub fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = Hierarchy::generate("localhost", 1).unwrap();
        let (root, ca) = hierarchy.write_to(dir.path()).unwrap();
        let issuer = Arc::new(Issuer::load(ca).unwrap());

        Self { dir, root, issuer }
    }

    /// Issues a credential for `host` and writes it next to the CA files.
    pub fn issue_credential(&self, host: &str) -> PathBuf {
        let end_entity = self.issuer.sign(host, &SignOptions::default()).unwrap();
        let path = self.dir.path().join(format!("{host}.pem"));
        let pem = end_entity.to_pem();
        write_owner_read_only(&path, pem.as_bytes()).unwrap();
        path
    }

    pub fn renew_config(&self, server_addr: SocketAddr, pem: &Path) -> RenewConfig {
        RenewConfig {
            url: format!("https://{SERVER_HOST}:{}", server_addr.port()),
            pem: pem.to_owned(),
            ca: self.root.clone(),
        }
    }
}

pub fn start_server(pki: &Pki) -> Result<(SocketAddr, Sender<()>), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))?;
    let addr = listener.local_addr()?;
    let (tx, rx) = tokio::sync::oneshot::channel();

    let server = RenewalServer::builder()
        .with_listener(listener)
        .with_issuer(Arc::clone(&pki.issuer))
        .with_client_roots(load_roots(&pki.root)?)
        .with_host(SERVER_HOST)
        .build()?;

    tokio::spawn(server.start(async {
        rx.await.unwrap_or_default();
    }));

    Ok((addr, tx))
}
