//! Enterprise certificate store integration via `certutil`.

use std::path::Path;

use lightproxy_elevate::{DirectElevator, Elevate, ElevatedCommand, Invocation};

use crate::{ensure_exists, TrustInstaller, TrustStoreError};

/// `certutil -enterprise -f -v -AddStore "Root" "<cert>"`
fn trust_command(cert_path: &Path) -> ElevatedCommand {
    ElevatedCommand::new(
        Invocation::new("certutil")
            .args(["-enterprise", "-f", "-v", "-AddStore"])
            .quoted_arg("Root")
            .quoted_arg(cert_path.to_string_lossy()),
    )
}

/// Adds the root CA to the enterprise Root store as a direct child process.
#[derive(Debug, Clone)]
pub struct GenericTrustInstaller<E = DirectElevator> {
    elevator: E,
}

impl<E: Elevate> GenericTrustInstaller<E> {
    pub fn new(elevator: E) -> Self {
        Self { elevator }
    }
}

impl<E: Elevate> TrustInstaller for GenericTrustInstaller<E> {
    async fn install_trust(&self, cert_path: &Path) -> Result<(), TrustStoreError> {
        ensure_exists(cert_path).await?;

        let command = trust_command(cert_path);
        tracing::info!(command = %command, "Registering root CA");
        match self.elevator.run(&command).await {
            Ok(output) => {
                tracing::debug!(output = %output.trim(), "certutil result");
                tracing::info!(path = %cert_path.display(), "Root CA installed in certificate store");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "certutil -AddStore failed");
                Err(e.into())
            }
        }
    }
}
