//! macOS trust store integration via `security`.

use std::path::Path;

use lightproxy_elevate::{Elevate, ElevatedCommand, Invocation, PromptElevator};

use crate::{ensure_exists, TrustInstaller, TrustStoreError};

pub const SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";

/// `security add-trusted-cert -d -r trustRoot -k <System.keychain> "<cert>"`
fn trust_command(cert_path: &Path) -> ElevatedCommand {
    ElevatedCommand::new(
        Invocation::new("security")
            .args(["add-trusted-cert", "-d", "-r", "trustRoot", "-k", SYSTEM_KEYCHAIN])
            .quoted_arg(cert_path.to_string_lossy()),
    )
}

/// Adds the root CA to the System keychain through the credential dialog.
#[derive(Debug, Clone)]
pub struct DarwinTrustInstaller<E = PromptElevator> {
    elevator: E,
}

impl<E: Elevate> DarwinTrustInstaller<E> {
    pub fn new(elevator: E) -> Self {
        Self { elevator }
    }
}

impl<E: Elevate> TrustInstaller for DarwinTrustInstaller<E> {
    async fn install_trust(&self, cert_path: &Path) -> Result<(), TrustStoreError> {
        ensure_exists(cert_path).await?;

        let command = trust_command(cert_path);
        match self.elevator.run(&command).await {
            Ok(_) => {
                tracing::info!(path = %cert_path.display(), "Root CA installed in macOS System Keychain");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "security add-trusted-cert failed");
                Err(e.into())
            }
        }
    }
}
