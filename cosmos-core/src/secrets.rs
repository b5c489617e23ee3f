//! Secrets management for Cosmos
//!
//! Secrets are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/cosmos/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GEMINI_API_KEY, then API_KEY)
//! 2. Secrets file (~/.config/cosmos/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variables checked for the API key, in order
const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

const TEMPLATE: &str = r#"# Cosmos secrets
# Keep this file private (chmod 600) and out of version control.

[gemini]
# Generative Language API key from https://aistudio.google.com/app/apikey
api_key = ""
"#;

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// Gemini configuration
    pub gemini: GeminiSecrets,
}

/// Gemini-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiSecrets {
    /// Generative Language API key
    pub api_key: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load secrets from a specific file, rejecting files others can read
    pub fn load_from_file(path: &Path) -> Result<Self> {
        ensure_private(path)?;

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        secrets.gemini.api_key = secrets
            .gemini
            .api_key
            .map(|key| key.trim().to_string());
        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/cosmos/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cosmos").join("secrets.toml"))
    }

    /// Get the Gemini API key with environment variable override
    ///
    /// Priority: GEMINI_API_KEY > API_KEY > secrets file
    pub fn gemini_api_key(&self) -> Option<String> {
        for var in API_KEY_VARS {
            if let Ok(key) = std::env::var(var) {
                let key = key.trim().to_string();
                if !key.is_empty() {
                    debug!(var = %var, "Using Gemini API key from environment");
                    return Some(key);
                }
            }
        }

        self.file_api_key()
    }

    /// API key from the secrets file only
    fn file_api_key(&self) -> Option<String> {
        match self.gemini.api_key {
            Some(ref key) if !key.is_empty() => {
                debug!("Using Gemini API key from secrets file");
                Some(key.clone())
            }
            _ => None,
        }
    }

    /// Create a template secrets file at the default location
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Create a template secrets file at `path`
    pub fn create_template_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        std::fs::write(path, TEMPLATE).map_err(Error::Io)?;
        restrict(path)?;

        warn!(path = %path.display(), "Created secrets template; add your Gemini API key to it");
        Ok(())
    }
}

#[cfg(unix)]
fn ensure_private(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path).map_err(Error::Io)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(Error::Config(format!(
            "Secrets file {} has insecure permissions {:o}; run `chmod 600 {}`",
            path.display(),
            mode,
            path.display()
        )));
    }
    debug!(path = %path.display(), mode = %format!("{:o}", mode), "Secrets file is private");
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restrict(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(Error::Io)
}

#[cfg(not(unix))]
fn restrict(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_secrets() {
        let secrets = Secrets::default();
        assert!(secrets.gemini.api_key.is_none());
        assert!(secrets.file_api_key().is_none());
    }

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[gemini]
api_key = "AIzaSy-test"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.gemini.api_key, Some("AIzaSy-test".to_string()));
    }

    #[test]
    fn test_empty_key_is_ignored() {
        let secrets = Secrets {
            gemini: GeminiSecrets {
                api_key: Some(String::new()),
            },
        };
        assert!(secrets.file_api_key().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gemini]\napi_key = \"test\"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o644);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let result = Secrets::load_from_file(&file.path().to_path_buf());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted_and_trimmed() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gemini]\napi_key = \"  key-123  \"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let secrets = Secrets::load_from_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(secrets.gemini.api_key, Some("key-123".to_string()));
    }

    #[test]
    fn test_create_template_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("secrets.toml");

        Secrets::create_template_at(&path).unwrap();
        assert!(path.exists());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[gemini]"));

        let err = Secrets::create_template_at(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
