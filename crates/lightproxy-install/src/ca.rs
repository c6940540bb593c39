//! Root CA generation.
//!
//! Creates a fresh RSA-2048 key with the `rsa` crate and self-signs a CA
//! certificate with `rcgen`. The validity window is backdated ten years so
//! that clients with badly skewed clocks still accept it.

use chrono::{DateTime, Months, SubsecRound, Utc};
use lightproxy_common::APP_NAME;
use rand::rngs::OsRng;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, SerialNumber, PKCS_RSA_SHA256,
};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;

use crate::certstore::CertBundle;
use crate::error::InstallError;

pub const RSA_KEY_BITS: usize = 2048;

/// Years on either side of the issue time.
const VALIDITY_YEARS: u32 = 10;

const SUBJECT_COUNTRY: &str = "CN";
const SUBJECT_STATE: &str = "Hangzhou";
const SUBJECT_LOCALITY: &str = "Hangzhou";
const SUBJECT_ORG_UNIT: &str = "https://github.com/alibaba/lightproxy";

/// The CA's RSA key pair in PEM form. Only ever persisted alongside its
/// certificate.
pub struct CaKeyPair {
    pub public_key_pem: String,
    pub private_key_pem: String,
}

impl std::fmt::Debug for CaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaKeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// The self-signed CA certificate.
#[derive(Debug, Clone)]
pub struct CaCertificate {
    /// Milliseconds since the Unix epoch at issue time.
    pub serial: u64,
    pub common_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub pem: String,
    pub der: Vec<u8>,
}

#[derive(Debug)]
pub struct GeneratedCa {
    pub key: CaKeyPair,
    pub cert: CaCertificate,
}

impl GeneratedCa {
    /// PEM texts for staging.
    pub fn bundle(&self) -> CertBundle {
        CertBundle {
            cert_pem: self.cert.pem.clone(),
            key_pem: self.key.private_key_pem.clone(),
        }
    }
}

/// `LightProxy-YYYY-MM-DD`, so successive installs are distinguishable in
/// the OS certificate manager.
pub fn common_name_for(issued_at: DateTime<Utc>) -> String {
    format!("{APP_NAME}-{}", issued_at.format("%Y-%m-%d"))
}

/// Generates a CA issued at the current time.
pub fn generate_now() -> Result<GeneratedCa, InstallError> {
    generate(Utc::now())
}

/// Generates a fresh key pair and a CA certificate issued at `issued_at`.
///
/// CPU-bound; async callers should run it on the blocking pool.
pub fn generate(issued_at: DateTime<Utc>) -> Result<GeneratedCa, InstallError> {
    // X.509 times carry whole seconds.
    let issued_at = issued_at.trunc_subsecs(0);
    let (not_before, not_after) = validity_window(issued_at)?;
    let serial = serial_for(issued_at)?;
    let common_name = common_name_for(issued_at);

    let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(InstallError::crypto)?;
    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(InstallError::crypto)?
        .to_string();
    let public_key_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(InstallError::crypto)?;

    let key_pair = KeyPair::from_pem_and_sign_algo(&private_key_pem, &PKCS_RSA_SHA256)
        .map_err(InstallError::crypto)?;

    let mut params = CertificateParams::default();
    params.distinguished_name = subject(&common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign];
    params.serial_number = Some(SerialNumber::from_slice(&serial_bytes(serial)));
    params.not_before = to_offset(not_before)?;
    params.not_after = to_offset(not_after)?;

    let cert = params
        .self_signed(&key_pair)
        .map_err(InstallError::crypto)?;

    Ok(GeneratedCa {
        key: CaKeyPair {
            public_key_pem,
            private_key_pem,
        },
        cert: CaCertificate {
            serial,
            common_name,
            not_before,
            not_after,
            pem: cert.pem(),
            der: cert.der().to_vec(),
        },
    })
}

fn subject(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::CountryName, SUBJECT_COUNTRY);
    dn.push(DnType::StateOrProvinceName, SUBJECT_STATE);
    dn.push(DnType::LocalityName, SUBJECT_LOCALITY);
    dn.push(DnType::OrganizationName, APP_NAME);
    dn.push(DnType::OrganizationalUnitName, SUBJECT_ORG_UNIT);
    dn
}

fn validity_window(
    issued_at: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), InstallError> {
    let span = Months::new(12 * VALIDITY_YEARS);
    let not_before = issued_at
        .checked_sub_months(span)
        .ok_or_else(|| InstallError::crypto("notBefore out of range"))?;
    let not_after = issued_at
        .checked_add_months(span)
        .ok_or_else(|| InstallError::crypto("notAfter out of range"))?;
    Ok((not_before, not_after))
}

fn serial_for(issued_at: DateTime<Utc>) -> Result<u64, InstallError> {
    u64::try_from(issued_at.timestamp_millis())
        .map_err(|_| InstallError::crypto("issue time predates the Unix epoch"))
}

/// Big-endian bytes without leading zeros.
fn serial_bytes(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

fn to_offset(dt: DateTime<Utc>) -> Result<time::OffsetDateTime, InstallError> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp()).map_err(InstallError::crypto)
}
