//! Certificate bundle staging and promotion.
//!
//! A freshly generated bundle is written to a private temporary directory
//! first. It is copied into the permanent certificate directory only after
//! the OS trusts it, so a failed trust step never leaves a key file behind
//! that would read as "installed". Promotion writes the key last, so a
//! partial copy never reads as installed either.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::InstallConfig;
use crate::error::InstallError;

const STAGING_PREFIX: &str = "lightproxy-cert-";

/// PEM texts to persist.
#[derive(Clone)]
pub struct CertBundle {
    pub cert_pem: String,
    pub key_pem: String,
}

/// A bundle written to its staging directory.
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedBundle {
    dir: TempDir,
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl StagedBundle {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

}

/// Sole writer of the permanent certificate directory.
#[derive(Debug, Clone)]
pub struct CertStore {
    key_file_name: String,
    cert_file_name: String,
}

impl CertStore {
    pub fn new(config: &InstallConfig) -> Self {
        Self {
            key_file_name: config.cert_key_file_name.clone(),
            cert_file_name: config.cert_file_name.clone(),
        }
    }

    /// Writes the bundle into a fresh temporary directory.
    pub async fn stage(&self, bundle: &CertBundle) -> Result<StagedBundle, InstallError> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|e| InstallError::io("Failed to create staging directory", std::env::temp_dir(), e))?;

        let key_path = dir.path().join(&self.key_file_name);
        let cert_path = dir.path().join(&self.cert_file_name);

        tokio::fs::write(&key_path, bundle.key_pem.as_bytes())
            .await
            .map_err(|e| InstallError::io("Failed to stage key", &key_path, e))?;
        restrict_to_owner(&key_path).await?;
        tokio::fs::write(&cert_path, bundle.cert_pem.as_bytes())
            .await
            .map_err(|e| InstallError::io("Failed to stage certificate", &cert_path, e))?;

        tracing::debug!(path = %dir.path().display(), "Certificate bundle staged");

        Ok(StagedBundle {
            dir,
            cert_path,
            key_path,
        })
    }

    /// Copies the staged directory over `dest_dir`, replacing any previous
    /// bundle. Everything except the key goes first; the key is then copied
    /// to a temporary name and renamed into place, so it only appears once
    /// the rest of the bundle is there. On Unix it is owner-only throughout.
    pub async fn promote(&self, staged: &StagedBundle, dest_dir: &Path) -> Result<(), InstallError> {
        copy_dir_all(staged.path(), dest_dir, Some(OsStr::new(&self.key_file_name))).await?;

        let key_path = dest_dir.join(&self.key_file_name);
        let partial = dest_dir.join(format!(".{}.partial", self.key_file_name));
        let result = place_key(&staged.key_path, &partial, &key_path).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result?;

        tracing::info!(path = %dest_dir.display(), "Certificate bundle promoted");
        Ok(())
    }
}

async fn place_key(staged: &Path, partial: &Path, key_path: &Path) -> Result<(), InstallError> {
    tokio::fs::copy(staged, partial)
        .await
        .map_err(|e| InstallError::io("Failed to copy key", partial, e))?;
    restrict_to_owner(partial).await?;
    tokio::fs::rename(partial, key_path)
        .await
        .map_err(|e| InstallError::io("Failed to move key into place", key_path, e))
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| InstallError::io("Failed to restrict key permissions", path, e))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}

/// Recursive copy; files in `dst` with matching names are overwritten.
/// `skip` names a top-level entry of `src` to leave out.
async fn copy_dir_all(src: &Path, dst: &Path, skip: Option<&OsStr>) -> Result<(), InstallError> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to)
            .await
            .map_err(|e| InstallError::io("Failed to create certificate directory", &to, e))?;

        let mut entries = tokio::fs::read_dir(&from)
            .await
            .map_err(|e| InstallError::io("Failed to read staging directory", &from, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| InstallError::io("Failed to read staging directory", &from, e))?
        {
            if from.as_path() == src && Some(entry.file_name().as_os_str()) == skip {
                continue;
            }
            let source = entry.path();
            let target = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| InstallError::io("Failed to inspect staged file", &source, e))?;

            if file_type.is_dir() {
                pending.push((source, target));
            } else {
                tokio::fs::copy(&source, &target)
                    .await
                    .map_err(|e| InstallError::io("Failed to copy certificate file", &target, e))?;
            }
        }
    }

    Ok(())
}
