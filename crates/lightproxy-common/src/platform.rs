use serde::{Deserialize, Serialize};

/// Which family of trust/helper strategy applies.
///
/// Only macOS needs the setuid helper and the graphical prompt; every other
/// target goes through the enterprise certificate store command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    MacOs,
    Other,
}

impl PlatformKind {
    /// Platform of the compile target.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }

    pub fn is_macos(self) -> bool {
        matches!(self, Self::MacOs)
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacOs => f.write_str("macos"),
            Self::Other => f.write_str("other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_matches_target() {
        assert_eq!(
            PlatformKind::current().is_macos(),
            cfg!(target_os = "macos")
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&PlatformKind::MacOs).unwrap();
        assert_eq!(json, "\"macos\"");
        let parsed: PlatformKind = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(parsed, PlatformKind::Other);
    }
}
