use std::path::PathBuf;

/// Environment variable that relocates the whole data directory.
pub const DATA_DIR_ENV: &str = "LIGHTPROXY_DATA_DIR";

/// Permanent certificate directory, relative to the data directory.
pub const CERT_DIR_NAME: &str = "certificates";

/// File name of the bundled helper, both beside the executable and in the
/// data directory.
pub const HELPER_FILE_NAME: &str = "proxy_conf_helper";

/// Root data directory for LightProxy.
///
/// Holds the promoted certificate bundle, the installed helper and the
/// optional `config.toml`. `LIGHTPROXY_DATA_DIR` wins over the home lookup.
///
/// - Unix: `~/.lightproxy/`
/// - Windows: `%USERPROFILE%\.lightproxy\`
pub fn lightproxy_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    #[cfg(windows)]
    {
        if let Some(profile) = std::env::var_os("USERPROFILE") {
            return PathBuf::from(profile).join(".lightproxy");
        }
    }

    #[cfg(not(windows))]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".lightproxy");
        }
    }

    // Fallback
    PathBuf::from(".lightproxy")
}

/// Default configuration file.
pub fn config_path() -> PathBuf {
    lightproxy_data_dir().join("config.toml")
}

/// The helper shipped next to the running executable.
pub fn helper_source_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(HELPER_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(HELPER_FILE_NAME))
}
