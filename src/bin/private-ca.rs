use clap::Parser;
use private_ca::{
    Error,
    certificate_authority::{Issuer, SignOptions},
    config::IssueConfig,
    credentials::write_owner_read_only,
};
use std::process::ExitCode;
use tracing::error;

fn issue(config: &IssueConfig) -> Result<(), Error> {
    let issuer = Issuer::load(&config.signer)?;
    let end_entity = issuer.sign(&config.host, &SignOptions::default())?;

    match &config.out {
        None => print!("{}", end_entity.to_pem()),
        Some(out) => {
            let path = out.join(format!("{}.pem", config.host));
            write_owner_read_only(&path, end_entity.to_pem().as_bytes())?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = IssueConfig::parse();

    if let Err(e) = issue(&config) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
