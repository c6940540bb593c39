//! Platform trust store integration for LightProxy.
//!
//! Registers the generated root CA certificate with the operating system so
//! that browsers trust certificates minted by the proxy.
//!
//! Platform support:
//! - **macOS**: `security add-trusted-cert` into the System keychain, behind
//!   the graphical administrator prompt
//! - **Everything else**: `certutil -enterprise -AddStore Root`, run as a
//!   direct elevated child process

mod darwin;
mod generic;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lightproxy_common::PlatformKind;
use lightproxy_elevate::{DirectElevator, ElevationError, PromptElevator};

pub use darwin::{DarwinTrustInstaller, SYSTEM_KEYCHAIN};
pub use generic::GenericTrustInstaller;

#[derive(Debug, thiserror::Error)]
pub enum TrustStoreError {
    #[error("trust store command failed: {0}")]
    Elevation(#[from] ElevationError),
    #[error("certificate not found at {}", .0.display())]
    MissingCertificate(PathBuf),
}

/// Registers a PEM certificate file as a trusted root.
pub trait TrustInstaller: Send + Sync {
    /// Adds the certificate at `cert_path` to the OS trust store.
    ///
    /// Requires administrator rights; on macOS this suspends until the user
    /// answers the credential dialog.
    fn install_trust(
        &self,
        cert_path: &Path,
    ) -> impl Future<Output = Result<(), TrustStoreError>> + Send;
}

/// Trust strategy chosen once for the running platform.
#[derive(Debug, Clone)]
pub enum PlatformTrustInstaller {
    Darwin(DarwinTrustInstaller<PromptElevator>),
    Generic(GenericTrustInstaller<DirectElevator>),
}

impl PlatformTrustInstaller {
    pub fn for_platform(
        platform: PlatformKind,
        app_name: &str,
        prompt_timeout: Option<Duration>,
    ) -> Self {
        match platform {
            PlatformKind::MacOs => Self::Darwin(DarwinTrustInstaller::new(
                PromptElevator::new(app_name).with_timeout(prompt_timeout),
            )),
            PlatformKind::Other => Self::Generic(GenericTrustInstaller::new(DirectElevator::new())),
        }
    }
}

impl TrustInstaller for PlatformTrustInstaller {
    async fn install_trust(&self, cert_path: &Path) -> Result<(), TrustStoreError> {
        match self {
            Self::Darwin(installer) => installer.install_trust(cert_path).await,
            Self::Generic(installer) => installer.install_trust(cert_path).await,
        }
    }
}

pub(crate) async fn ensure_exists(cert_path: &Path) -> Result<(), TrustStoreError> {
    match tokio::fs::try_exists(cert_path).await {
        Ok(true) => Ok(()),
        _ => Err(TrustStoreError::MissingCertificate(cert_path.to_path_buf())),
    }
}
