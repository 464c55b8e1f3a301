//! Command line configuration for the bundled tools. Each tool parses its config once in `main`
//! and passes it down by reference.

use clap::Parser;
use std::path::PathBuf;

/// Issue a credential from the intermediate CA.
#[derive(Clone, Debug, Parser)]
#[command(name = "private-ca", version)]
pub struct IssueConfig {
    /// File holding the CA private key and certificate.
    #[arg(long)]
    pub signer: PathBuf,

    /// Hostname placed in the issued certificate.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Directory to write `<host>.pem` to. Prints to stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Serve certificate renewals over mTLS.
#[derive(Clone, Debug, Parser)]
#[command(name = "private-ca-server", version)]
pub struct ServeConfig {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// File holding the CA private key and certificate.
    #[arg(long)]
    pub signer: PathBuf,

    /// Hostname placed in the server's own certificate.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// PEM file of roots that client certificates must chain to.
    #[arg(long)]
    pub client_roots: PathBuf,
}

/// Renew a credential against a renewal server.
#[derive(Clone, Debug, Parser)]
#[command(name = "private-ca-client", version)]
pub struct RenewConfig {
    /// Base URL of the renewal server.
    #[arg(long)]
    pub url: String,

    /// Credential to present and replace.
    #[arg(long)]
    pub pem: PathBuf,

    /// PEM file of roots the server certificate must chain to.
    #[arg(long)]
    pub ca: PathBuf,
}

/// Generate a root and a domain-constrained intermediate CA.
#[derive(Clone, Debug, Parser)]
#[command(name = "private-ca-init", version)]
pub struct InitConfig {
    /// Domain the intermediate may issue for.
    #[arg(long, default_value = "localhost")]
    pub domain: String,

    /// Number placed in the root's common name.
    #[arg(long, default_value_t = 1)]
    pub root_id: u32,

    /// Directory to write `root.pem` and `<domain>.ca.pem` to.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn commands_are_well_formed() {
        IssueConfig::command().debug_assert();
        ServeConfig::command().debug_assert();
        RenewConfig::command().debug_assert();
        InitConfig::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let config = ServeConfig::try_parse_from([
            "private-ca-server",
            "--signer",
            "ca.pem",
            "--client-roots",
            "root.pem",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.client_roots, PathBuf::from("root.pem"));
    }

    #[test]
    fn issue_requires_signer() {
        assert!(IssueConfig::try_parse_from(["private-ca"]).is_err());

        let args = ["private-ca", "--signer", "ca.pem"];
        let config = IssueConfig::try_parse_from(args).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.out, None);
    }

    #[test]
    fn init_defaults() {
        let config = InitConfig::try_parse_from(["private-ca-init"]).unwrap();
        assert_eq!(config.domain, "localhost");
        assert_eq!(config.root_id, 1);
        assert_eq!(config.out, PathBuf::from("."));
    }

    #[test]
    fn renew_flags() {
        let config = RenewConfig::try_parse_from([
            "private-ca-client",
            "--url",
            "https://localhost:8080",
            "--pem",
            "client.pem",
            "--ca",
            "root.pem",
        ])
        .unwrap();
        assert_eq!(config.url, "https://localhost:8080");
        assert_eq!(config.pem, PathBuf::from("client.pem"));
    }
}
