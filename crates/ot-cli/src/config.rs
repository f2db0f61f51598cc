//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ot_core::Retention;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Toggl API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Toggl workspace new entries are created in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<u64>,

    /// CLOCK entries that ended longer ago than this are ignored.
    /// Values below 1 fall back to 30.
    pub skip_clocks_older_than_days: i64,

    /// Root of the Toggl API.
    pub api_base_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("workspace_id", &self.workspace_id)
            .field(
                "skip_clocks_older_than_days",
                &self.skip_clocks_older_than_days,
            )
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            workspace_id: None,
            skip_clocks_older_than_days: Retention::DEFAULT_DAYS,
            api_base_url: ot_toggl::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Settings required before anything is sent to Toggl.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub api_token: &'a str,
    pub workspace_id: u64,
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ORG_TOGGL_*)
        figment = figment.merge(Env::prefixed("ORG_TOGGL_"));

        figment.extract()
    }

    pub const fn retention(&self) -> Retention {
        Retention::days(self.skip_clocks_older_than_days)
    }

    /// Returns the token and workspace, or names the first missing setting.
    pub fn credentials(&self) -> Result<Credentials<'_>> {
        let api_token = self
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty());
        let Some(api_token) = api_token else {
            bail!("missing api_token (set ORG_TOGGL_API_TOKEN or config.toml)");
        };
        let Some(workspace_id) = self.workspace_id else {
            bail!("missing workspace_id (set ORG_TOGGL_WORKSPACE_ID or config.toml)");
        };
        Ok(Credentials {
            api_token,
            workspace_id,
        })
    }
}

/// Returns the platform-specific config directory for org-toggl.
///
/// On Linux: `~/.config/org-toggl`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("org-toggl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_dirs_config_path_ends_with_org_toggl() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "org-toggl");
    }

    #[test]
    fn test_default_config_has_thirty_day_retention() {
        let config = Config::default();
        assert_eq!(config.retention().as_days(), 30);
        assert_eq!(config.api_base_url, ot_toggl::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_retention_below_one_falls_back_to_default() {
        let config = Config {
            skip_clocks_older_than_days: 0,
            ..Config::default()
        };
        assert_eq!(config.retention().as_days(), 30);

        let config = Config {
            skip_clocks_older_than_days: 3,
            ..Config::default()
        };
        assert_eq!(config.retention().as_days(), 3);
    }

    #[test]
    fn test_debug_redacts_api_token() {
        let config = Config {
            api_token: Some("super-secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credentials_require_token_and_workspace() {
        let mut config = Config::default();
        let err = config.credentials().err().unwrap();
        assert!(err.to_string().contains("api_token"));

        config.api_token = Some("   ".to_string());
        assert!(config.credentials().is_err());

        config.api_token = Some("token".to_string());
        let err = config.credentials().err().unwrap();
        assert!(err.to_string().contains("workspace_id"));

        config.workspace_id = Some(42);
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.api_token, "token");
        assert_eq!(credentials.workspace_id, 42);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_token = "from-file"
workspace_id = 7
skip_clocks_older_than_days = 14
api_base_url = "http://localhost:9999"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.api_token.as_deref(), Some("from-file"));
        assert_eq!(config.workspace_id, Some(7));
        assert_eq!(config.retention().as_days(), 14);
        assert_eq!(config.api_base_url, "http://localhost:9999");
    }
}
