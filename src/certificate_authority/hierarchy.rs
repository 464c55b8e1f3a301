use crate::{
    Error,
    certificate_authority::{add_months, random_serial},
    credentials::write_owner_read_only,
};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    GeneralSubtree, IsCa, KeyPair, KeyUsagePurpose, NameConstraints, PKCS_ECDSA_P256_SHA256,
};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;

/// Validity of both CA certificates, in calendar months.
const CA_VALIDITY_MONTHS: u8 = 12;

/// A freshly generated two level CA hierarchy.
///
/// The root is self-signed. The intermediate is restricted to names under `domain`, may not sign
/// further CAs, and is the CA material consumed by [`Issuer`](super::Issuer).
#[derive(Clone, Debug)]
pub struct Hierarchy {
    pub domain: String,
    pub root_pem: String,
    pub ca_cert_pem: String,
    pub ca_key_pem: String,
}

impl Hierarchy {
    /// Generates a root named `"<domain> Root <root_id>"` and an intermediate named
    /// `"<domain> CA"`.
    ///
    /// # Errors
    ///
    /// This will return an error if `domain` is not a valid DNS name or if key generation or
    /// signing fails.
    pub fn generate(domain: &str, root_id: u32) -> Result<Self, Error> {
        let not_before = OffsetDateTime::now_utc();
        let not_after = add_months(not_before, CA_VALIDITY_MONTHS)?;

        let mut root_params = ca_params(format!("{domain} Root {root_id}"), not_before, not_after);
        root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let root_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let root_cert = root_params.self_signed(&root_key)?;

        let mut ca_params = ca_params(format!("{domain} CA"), not_before, not_after);
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        ca_params.name_constraints = Some(NameConstraints {
            permitted_subtrees: vec![GeneralSubtree::DnsName(domain.to_owned())],
            excluded_subtrees: Vec::new(),
        });
        ca_params.use_authority_key_identifier_extension = true;

        let ca_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let ca_cert = ca_params.signed_by(&ca_key, &root_cert, &root_key)?;

        Ok(Self {
            domain: domain.to_owned(),
            root_pem: root_cert.pem(),
            ca_cert_pem: ca_cert.pem(),
            ca_key_pem: ca_key.serialize_pem(),
        })
    }

    /// The intermediate's key followed by its certificate.
    pub fn ca_material(&self) -> String {
        format!("{}{}", self.ca_key_pem, self.ca_cert_pem)
    }

    /// Writes `root.pem` and `<domain>.ca.pem` into `dir`, returning both paths.
    ///
    /// The CA material file is created readable by its owner only.
    ///
    /// # Errors
    ///
    /// This will return an error if either file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<(PathBuf, PathBuf), Error> {
        let root_path = dir.join("root.pem");
        std::fs::write(&root_path, &self.root_pem)?;
        info!(path = %root_path.display(), "Wrote root certificate");

        let ca_path = dir.join(format!("{}.ca.pem", self.domain));
        write_owner_read_only(&ca_path, self.ca_material().as_bytes())?;
        info!(path = %ca_path.display(), "Wrote CA material");

        Ok((root_path, ca_path))
    }
}

fn ca_params(
    common_name: String,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.serial_number = Some(random_serial());
    params.not_before = not_before;
    params.not_after = not_after;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, common_name);
    params.distinguished_name = distinguished_name;

    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ClientAuth,
        ExtendedKeyUsagePurpose::ServerAuth,
    ];
    params
}
