use clap::Parser;
use private_ca::{
    Error, RenewalServer, certificate_authority::Issuer, config::ServeConfig,
    credentials::load_roots,
};
use std::{net::SocketAddr, process::ExitCode, sync::Arc};
use tracing::error;

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}

async fn serve(config: &ServeConfig) -> Result<(), Error> {
    let client_roots = load_roots(&config.client_roots)?;
    let issuer = Arc::new(Issuer::load(&config.signer)?);

    let server = RenewalServer::builder()
        .with_addr(SocketAddr::from(([0, 0, 0, 0], config.port)))
        .with_issuer(issuer)
        .with_client_roots(client_roots)
        .with_host(config.host.clone())
        .build()?;

    server.start(shutdown_signal()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = ServeConfig::parse();

    if let Err(e) = serve(&config).await {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
