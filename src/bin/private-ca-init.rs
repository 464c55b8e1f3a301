use clap::Parser;
use private_ca::{Error, certificate_authority::Hierarchy, config::InitConfig};
use std::process::ExitCode;
use tracing::error;

fn init(config: &InitConfig) -> Result<(), Error> {
    let hierarchy = Hierarchy::generate(&config.domain, config.root_id)?;
    let (root, ca) = hierarchy.write_to(&config.out)?;

    println!("Wrote {}", root.display());
    println!("Wrote {}", ca.display());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = InitConfig::parse();

    if let Err(e) = init(&config) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
