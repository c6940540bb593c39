//! Install state detection.
//!
//! Both flags are read from disk on every call; nothing is remembered
//! between runs. Certificate state is file existence only: a certificate
//! the user later removed from the OS trust store still reads as installed
//! while its key file is present.

use serde::Serialize;

use crate::config::InstallConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallStatus {
    pub cert_installed: bool,
    pub helper_installed: bool,
}

impl InstallStatus {
    pub fn is_complete(&self) -> bool {
        self.cert_installed && self.helper_installed
    }
}

/// True iff the permanent key file exists.
pub async fn cert_installed(config: &InstallConfig) -> bool {
    let installed = tokio::fs::try_exists(&config.cert_key_path)
        .await
        .unwrap_or(false);
    tracing::debug!(path = %config.cert_key_path.display(), installed, "Cert install status");
    installed
}

/// Always true off macOS. On macOS, true iff the helper exists and is owned
/// by root.
pub async fn helper_installed(config: &InstallConfig) -> bool {
    if !config.platform.is_macos() {
        return true;
    }
    let installed = match tokio::fs::metadata(&config.helper_dest_path).await {
        Ok(meta) => owned_by_root(&meta),
        Err(_) => false,
    };
    tracing::debug!(path = %config.helper_dest_path.display(), installed, "Helper install status");
    installed
}

pub async fn probe(config: &InstallConfig) -> InstallStatus {
    InstallStatus {
        cert_installed: cert_installed(config).await,
        helper_installed: helper_installed(config).await,
    }
}

#[cfg(unix)]
fn owned_by_root(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    meta.uid() == 0
}

#[cfg(not(unix))]
fn owned_by_root(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightproxy_common::PlatformKind;

    #[tokio::test]
    async fn fresh_directory_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let config = InstallConfig::in_data_dir(dir.path(), PlatformKind::MacOs);
        let status = probe(&config).await;
        assert!(!status.cert_installed);
        assert!(!status.helper_installed);
        assert!(!status.is_complete());
    }

    #[tokio::test]
    async fn key_file_alone_means_cert_installed() {
        let dir = tempfile::tempdir().unwrap();
        let config = InstallConfig::in_data_dir(dir.path(), PlatformKind::Other);
        std::fs::create_dir_all(&config.cert_dir_path).unwrap();
        std::fs::write(&config.cert_key_path, "not even a key").unwrap();

        assert!(cert_installed(&config).await);
    }

    #[tokio::test]
    async fn cert_file_without_key_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let config = InstallConfig::in_data_dir(dir.path(), PlatformKind::Other);
        std::fs::create_dir_all(&config.cert_dir_path).unwrap();
        std::fs::write(config.cert_path(), "cert").unwrap();

        assert!(!cert_installed(&config).await);
    }

    #[tokio::test]
    async fn helper_always_installed_off_macos() {
        let dir = tempfile::tempdir().unwrap();
        let config = InstallConfig::in_data_dir(dir.path(), PlatformKind::Other);
        assert!(!config.helper_dest_path.exists());
        assert!(helper_installed(&config).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn helper_ownership_decides() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let config = InstallConfig::in_data_dir(dir.path(), PlatformKind::MacOs);
        std::fs::write(&config.helper_dest_path, "helper").unwrap();

        let uid = std::fs::metadata(&config.helper_dest_path).unwrap().uid();
        assert_eq!(helper_installed(&config).await, uid == 0);

        let status = InstallStatus {
            cert_installed: true,
            helper_installed: uid == 0,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({ "cert_installed": true, "helper_installed": uid == 0 })
        );
    }
}
