//! Proxy configuration helper installation.
//!
//! On macOS the proxy rewrites system network settings through a small
//! helper binary. Installing it setuid-root once means later proxy runs can
//! re-exec it without another credential prompt. Other platforms have no
//! helper.

use std::future::Future;
use std::path::{Path, PathBuf};

use lightproxy_common::PlatformKind;
use lightproxy_elevate::{Elevate, ElevatedCommand, ElevationError, Invocation, PromptElevator};

use crate::config::InstallConfig;

#[derive(Debug, thiserror::Error)]
pub enum HelperInstallError {
    #[error("failed to copy helper from {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set helper ownership and permissions: {0}")]
    Permissions(#[from] ElevationError),
}

pub trait HelperInstaller: Send + Sync {
    /// Puts the helper in place with its privileged permissions.
    fn install_helper(&self) -> impl Future<Output = Result<(), HelperInstallError>> + Send;
}

/// `chown root:admin "<helper>" && chmod a+rx+s "<helper>"`
pub fn permission_command(helper_path: &Path) -> ElevatedCommand {
    let path = helper_path.to_string_lossy();
    ElevatedCommand::new(Invocation::new("chown").arg("root:admin").quoted_arg(path.clone()))
        .and_then(Invocation::new("chmod").arg("a+rx+s").quoted_arg(path))
}

/// Copies the bundled helper and makes it setuid-root via the prompt.
#[derive(Debug, Clone)]
pub struct DarwinHelperInstaller<E = PromptElevator> {
    source: PathBuf,
    dest: PathBuf,
    elevator: E,
}

impl<E: Elevate> DarwinHelperInstaller<E> {
    pub fn new(config: &InstallConfig, elevator: E) -> Self {
        Self {
            source: config.helper_source_path.clone(),
            dest: config.helper_dest_path.clone(),
            elevator,
        }
    }

    async fn copy_helper(&self) -> Result<(), HelperInstallError> {
        let copy_err = |source| HelperInstallError::Copy {
            from: self.source.clone(),
            to: self.dest.clone(),
            source,
        };

        if let Some(parent) = self.dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(copy_err)?;
        }
        tokio::fs::copy(&self.source, &self.dest)
            .await
            .map_err(copy_err)?;
        Ok(())
    }
}

impl<E: Elevate> HelperInstaller for DarwinHelperInstaller<E> {
    async fn install_helper(&self) -> Result<(), HelperInstallError> {
        tracing::info!(
            from = %self.source.display(),
            to = %self.dest.display(),
            "Installing proxy helper"
        );
        self.copy_helper().await?;

        if let Err(e) = self.elevator.run(&permission_command(&self.dest)).await {
            tracing::warn!(error = %e, "Could not make helper setuid-root");
            return Err(e.into());
        }

        tracing::info!(path = %self.dest.display(), "Proxy helper installed");
        Ok(())
    }
}

/// Platforms without a helper.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHelperInstaller;

impl HelperInstaller for NoopHelperInstaller {
    async fn install_helper(&self) -> Result<(), HelperInstallError> {
        Ok(())
    }
}

/// Helper strategy chosen once for the configured platform.
#[derive(Debug, Clone)]
pub enum PlatformHelperInstaller {
    Darwin(DarwinHelperInstaller<PromptElevator>),
    Noop(NoopHelperInstaller),
}

impl PlatformHelperInstaller {
    pub fn for_config(config: &InstallConfig) -> Self {
        match config.platform {
            PlatformKind::MacOs => Self::Darwin(DarwinHelperInstaller::new(
                config,
                PromptElevator::new(&config.app_name).with_timeout(config.prompt_timeout),
            )),
            PlatformKind::Other => Self::Noop(NoopHelperInstaller),
        }
    }
}

impl HelperInstaller for PlatformHelperInstaller {
    async fn install_helper(&self) -> Result<(), HelperInstallError> {
        match self {
            Self::Darwin(installer) => installer.install_helper().await,
            Self::Noop(installer) => installer.install_helper().await,
        }
    }
}
