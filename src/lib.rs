//! A small private certificate authority for services that authenticate each other with mutual
//! TLS.
//!
//! - Issue short-lived end-entity credentials from an intermediate CA with
//!   [`certificate_authority::Issuer`]
//! - Bootstrap a root and a domain-constrained intermediate with
//!   [`certificate_authority::Hierarchy`]
//! - Serve renewals over mTLS with [`RenewalServer`], whose own certificate renews itself through
//!   [`ServerIdentity`]
//! - Renew a credential on disk with [`client::renew`]

mod error;

pub mod certificate_authority;
pub mod client;
pub mod config;
pub mod credentials;
pub mod identity;
pub mod server;

pub use hyper;
pub use rcgen;
pub use tokio_rustls::rustls;

pub use error::Error;
pub use identity::ServerIdentity;
pub use server::{RENEW_PATH, RenewHandler, RenewalServer, RenewalServerBuilder};
