//! Install configuration.
//!
//! Every path the installer touches comes from [`InstallConfig`], built once
//! at startup and handed to each component. Defaults derive from the data
//! directory; an optional `config.toml` overlays them:
//!
//! ```toml
//! cert_dir = "/Users/me/.lightproxy/certificates"
//! helper_source = "/Applications/LightProxy.app/Contents/Resources/proxy_conf_helper"
//! prompt_timeout_secs = 120
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use lightproxy_common::{paths, PlatformKind, APP_NAME};
use serde::Deserialize;

use crate::error::InstallError;

pub const DEFAULT_CERT_KEY_FILE_NAME: &str = "key.pem";
pub const DEFAULT_CERT_FILE_NAME: &str = "cert.pem";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub cert_key_file_name: String,
    pub cert_file_name: String,
    /// Permanent directory the staged bundle is promoted into.
    pub cert_dir_path: PathBuf,
    /// `cert_dir_path/cert_key_file_name`; its existence means "installed".
    pub cert_key_path: PathBuf,
    pub helper_source_path: PathBuf,
    pub helper_dest_path: PathBuf,
    pub platform: PlatformKind,
    /// Shown in the macOS credential dialog.
    pub app_name: String,
    /// Upper bound on waiting for the credential dialog. `None` waits forever.
    pub prompt_timeout: Option<Duration>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        let mut config = Self::in_data_dir(&paths::lightproxy_data_dir(), PlatformKind::current());
        config.helper_source_path = paths::helper_source_path();
        config
    }
}

/// On-disk overrides. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cert_dir: Option<PathBuf>,
    cert_key_file_name: Option<String>,
    cert_file_name: Option<String>,
    helper_source: Option<PathBuf>,
    helper_dest: Option<PathBuf>,
    platform: Option<PlatformKind>,
    app_name: Option<String>,
    prompt_timeout_secs: Option<u64>,
}

impl InstallConfig {
    /// Layout rooted at `data_dir`, with the helper source expected inside it.
    pub fn in_data_dir(data_dir: &Path, platform: PlatformKind) -> Self {
        let cert_dir_path = data_dir.join(paths::CERT_DIR_NAME);
        Self {
            cert_key_file_name: DEFAULT_CERT_KEY_FILE_NAME.to_string(),
            cert_file_name: DEFAULT_CERT_FILE_NAME.to_string(),
            cert_key_path: cert_dir_path.join(DEFAULT_CERT_KEY_FILE_NAME),
            cert_dir_path,
            helper_source_path: data_dir.join("bundled").join(paths::HELPER_FILE_NAME),
            helper_dest_path: data_dir.join(paths::HELPER_FILE_NAME),
            platform,
            app_name: APP_NAME.to_string(),
            prompt_timeout: None,
        }
    }

    /// Path of the promoted certificate file.
    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir_path.join(&self.cert_file_name)
    }

    pub fn with_prompt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Defaults overlaid with `path`, or with the default `config.toml` when
    /// `path` is `None`. Only an explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, InstallError> {
        match path {
            Some(path) => Self::default().overlay_file(path),
            None => {
                let default_path = paths::config_path();
                if default_path.exists() {
                    Self::default().overlay_file(&default_path)
                } else {
                    tracing::debug!(path = %default_path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Applies the TOML overrides in `path` on top of `self`.
    pub fn overlay_file(self, path: &Path) -> Result<Self, InstallError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| InstallError::io("Failed to read config file", path, e))?;
        let config = self.overlay_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    fn overlay_str(mut self, contents: &str) -> Result<Self, InstallError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| InstallError::Config(e.to_string()))?;

        if let Some(dir) = file.cert_dir {
            self.cert_dir_path = dir;
        }
        if let Some(name) = file.cert_key_file_name {
            self.cert_key_file_name = name;
        }
        if let Some(name) = file.cert_file_name {
            self.cert_file_name = name;
        }
        if let Some(path) = file.helper_source {
            self.helper_source_path = path;
        }
        if let Some(path) = file.helper_dest {
            self.helper_dest_path = path;
        }
        if let Some(platform) = file.platform {
            self.platform = platform;
        }
        if let Some(name) = file.app_name {
            self.app_name = name;
        }
        if let Some(secs) = file.prompt_timeout_secs {
            self.prompt_timeout = Some(Duration::from_secs(secs));
        }
        self.cert_key_path = self.cert_dir_path.join(&self.cert_key_file_name);

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), InstallError> {
        if self.cert_key_file_name.is_empty() || self.cert_file_name.is_empty() {
            return Err(InstallError::Config(
                "certificate file names must not be empty".into(),
            ));
        }
        for name in [&self.cert_key_file_name, &self.cert_file_name] {
            if !is_plain_file_name(name) {
                return Err(InstallError::Config(format!(
                    "certificate file name {name:?} must be a bare file name"
                )));
            }
        }
        if self.cert_key_file_name == self.cert_file_name {
            return Err(InstallError::Config(
                "certificate and key file names must differ".into(),
            ));
        }
        if self.app_name.trim().is_empty() {
            return Err(InstallError::Config("app_name must not be empty".into()));
        }
        Ok(())
    }
}

/// A single normal path component: no separators, no `..`, not absolute.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
