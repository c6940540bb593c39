//! LightProxy install: root CA provisioning and proxy helper setup.
//!
//! Run once at proxy startup. [`Installer::check_install_status`] inspects
//! what is already on disk and runs whichever of the two install branches
//! is missing:
//!
//! - **Certificate**: generate an RSA CA → stage it in a temp dir → register
//!   it with the OS trust store → promote it into the certificate directory.
//! - **Helper** (macOS only): copy the bundled helper and make it
//!   setuid-root.
//!
//! The branches are independent. A failure in one is reported after the
//! other has had its turn.

pub mod ca;
pub mod certstore;
pub mod config;
pub mod error;
pub mod helper;
pub mod state;

use serde::Serialize;

use lightproxy_truststore::{PlatformTrustInstaller, TrustInstaller};

pub use certstore::{CertBundle, CertStore, StagedBundle};
pub use config::InstallConfig;
pub use error::InstallError;
pub use helper::{HelperInstallError, HelperInstaller, PlatformHelperInstaller};
pub use state::InstallStatus;

/// What one branch did during a successful call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOutcome {
    AlreadyInstalled,
    Installed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub certificate: BranchOutcome,
    pub helper: BranchOutcome,
}

impl InstallReport {
    /// True when nothing had to be installed.
    pub fn was_noop(&self) -> bool {
        self.certificate == BranchOutcome::AlreadyInstalled
            && self.helper == BranchOutcome::AlreadyInstalled
    }
}

/// The install-state orchestrator.
pub struct Installer<T = PlatformTrustInstaller, H = PlatformHelperInstaller> {
    config: InstallConfig,
    store: CertStore,
    trust: T,
    helper: H,
}

impl Installer {
    /// Selects the trust and helper strategies for `config.platform`.
    pub fn for_platform(config: InstallConfig) -> Self {
        let trust = PlatformTrustInstaller::for_platform(
            config.platform,
            &config.app_name,
            config.prompt_timeout,
        );
        let helper = PlatformHelperInstaller::for_config(&config);
        Self::new(config, trust, helper)
    }
}

impl<T: TrustInstaller, H: HelperInstaller> Installer<T, H> {
    pub fn new(config: InstallConfig, trust: T, helper: H) -> Self {
        let store = CertStore::new(&config);
        Self {
            config,
            store,
            trust,
            helper,
        }
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Reads both install flags without changing anything.
    pub async fn status(&self) -> InstallStatus {
        state::probe(&self.config).await
    }

    /// Installs whatever is missing.
    ///
    /// Each flag is read from disk once; a branch that completes is taken as
    /// installed without re-reading. Both branches always run before this
    /// returns, so a certificate failure does not skip the helper.
    pub async fn check_install_status(&self) -> Result<InstallReport, InstallError> {
        let certificate = if state::cert_installed(&self.config).await {
            Ok(BranchOutcome::AlreadyInstalled)
        } else {
            self.install_cert().await.map(|()| BranchOutcome::Installed)
        };
        if let Err(e) = &certificate {
            tracing::error!(error = %e, "Certificate install failed");
        }

        let helper = if state::helper_installed(&self.config).await {
            Ok(BranchOutcome::AlreadyInstalled)
        } else {
            self.helper
                .install_helper()
                .await
                .map(|()| BranchOutcome::Installed)
                .map_err(InstallError::from)
        };
        if let Err(e) = &helper {
            tracing::error!(error = %e, "Helper install failed");
        }

        match (certificate, helper) {
            (Ok(certificate), Ok(helper)) => {
                let report = InstallReport {
                    certificate,
                    helper,
                };
                tracing::info!(?report, "Install check complete");
                Ok(report)
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(certificate), Err(helper)) => Err(InstallError::Both {
                certificate: Box::new(certificate),
                helper: Box::new(helper),
            }),
        }
    }

    /// generate → stage → trust → promote. The staging directory is removed
    /// on every exit path.
    async fn install_cert(&self) -> Result<(), InstallError> {
        tracing::info!("Installing root CA");

        let ca = tokio::task::spawn_blocking(ca::generate_now)
            .await
            .map_err(InstallError::crypto)??;
        tracing::info!(
            serial = ca.cert.serial,
            common_name = %ca.cert.common_name,
            "Root CA generated"
        );

        let staged = self.store.stage(&ca.bundle()).await?;
        self.trust.install_trust(staged.cert_path()).await?;
        self.store
            .promote(&staged, &self.config.cert_dir_path)
            .await?;
        Ok(())
    }
}

/// Runs the install check with the strategies for `config.platform`.
pub async fn check_install_status(config: InstallConfig) -> Result<InstallReport, InstallError> {
    Installer::for_platform(config).check_install_status().await
}
