//! Self-signed leaf certificate generation.

use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_RSA_SHA256,
};
use time::{Duration, OffsetDateTime};

use crate::error::{CertError, Result};
use crate::san::SubjectAltName;

/// Organization written into every generated subject.
pub const ORGANIZATION: &str = "GamePanel";

/// Provides the key pair a certificate is signed with.
///
/// The generator owns its source instead of relying on a process-wide
/// crypto provider.
pub trait KeySource: Send + Sync {
    fn generate_key_pair(&self) -> std::result::Result<KeyPair, rcgen::Error>;
}

/// RSA 2048 keys signed with SHA-256, via the aws-lc-rs backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaKeySource;

impl KeySource for RsaKeySource {
    fn generate_key_pair(&self) -> std::result::Result<KeyPair, rcgen::Error> {
        KeyPair::generate_for(&PKCS_RSA_SHA256)
    }
}

/// PEM text of a freshly generated pair.
#[derive(Clone)]
pub struct GeneratedPair {
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for GeneratedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedPair")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

pub struct CertificateGenerator {
    keys: Box<dyn KeySource>,
}

impl Default for CertificateGenerator {
    fn default() -> Self {
        Self::new(Box::new(RsaKeySource))
    }
}

impl CertificateGenerator {
    pub fn new(keys: Box<dyn KeySource>) -> Self {
        Self { keys }
    }

    /// Produce a complete certificate/key pair or fail with
    /// [`CertError::GenerationFailure`].
    ///
    /// The certificate is a leaf: `CA:FALSE`, digitalSignature and
    /// keyEncipherment only, serverAuth only. Validity starts now.
    pub fn generate(
        &self,
        common_name: &str,
        organization: &str,
        sans: &[SubjectAltName],
        validity_days: u32,
    ) -> Result<GeneratedPair> {
        if validity_days == 0 {
            return Err(CertError::InvalidOptions(
                "validity_days must be positive".to_string(),
            ));
        }

        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        dn.push(DnType::OrganizationName, organization);
        params.distinguished_name = dn;

        params.subject_alt_names = sans
            .iter()
            .map(SubjectAltName::to_san_type)
            .collect::<Result<Vec<_>>>()?;

        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + Duration::days(i64::from(validity_days));

        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

        let key_pair = self.keys.generate_key_pair()?;
        let cert = params.self_signed(&key_pair)?;

        Ok(GeneratedPair {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }
}
