//! Install error types.

use std::path::PathBuf;

use lightproxy_truststore::TrustStoreError;

use crate::helper::HelperInstallError;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("failed to generate root CA: {0}")]
    CryptoGeneration(String),

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to trust root CA: {0}")]
    TrustInstall(#[from] TrustStoreError),

    #[error("failed to install proxy helper: {0}")]
    HelperInstall(#[from] HelperInstallError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("certificate install failed: {certificate}; helper install failed: {helper}")]
    Both {
        certificate: Box<InstallError>,
        helper: Box<InstallError>,
    },
}

impl InstallError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn crypto(e: impl std::fmt::Display) -> Self {
        Self::CryptoGeneration(e.to_string())
    }
}
