//! Configuration.
//!
//! [`Settings`] is loaded from TOML, then environment overrides are applied
//! and the result is validated:
//!
//! ```toml
//! [server]
//! realm = "api"
//! token_keyword = "Token"
//! session_cookie = "sessionid"
//! enforce_content_type = true
//! default_format = "json"
//! max_body_bytes = 2097152
//!
//! [logging]
//! filter = "info,unchained=debug"
//! ```
//!
//! | Variable | Overrides |
//! |---|---|
//! | `UNCHAINED_LOG` | `logging.filter` |
//! | `UNCHAINED_REALM` | `server.realm` |
//! | `UNCHAINED_ENFORCE_CONTENT_TYPE` | `server.enforce_content_type` |
//! | `UNCHAINED_DEFAULT_FORMAT` | `server.default_format` |
//!
//! [`ViewConfig`] is the per-handler policy (authentication schemes,
//! permissions, negotiation) passed explicitly to each handler.

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use unchained_core::Format;

use crate::{
    authentication::Authentication,
    permissions::{AllowAny, Permission},
};

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

fn invalid(key: &'static str, message: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        key,
        message: message.into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SETTINGS
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Realm announced by Basic authentication challenges.
    pub realm: String,
    pub token_keyword: String,
    pub session_cookie: String,
    /// Reject bodies whose `Content-Type` is missing or unrecognized.
    pub enforce_content_type: bool,
    pub default_format: Format,
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            realm: "api".to_string(),
            token_keyword: "Token".to_string(),
            session_cookie: "sessionid".to_string(),
            enforce_content_type: false,
            default_format: Format::Json,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// `tracing-subscriber` `EnvFilter` directives.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load `path`, apply environment overrides and validate. A missing file
    /// yields the defaults.
    pub async fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = match tokio::fs::read_to_string(path).await {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        settings.apply_env_vars()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate without consulting the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env_vars(&mut self) -> Result<(), SettingsError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("UNCHAINED_LOG") {
            self.logging.filter = value;
        }

        if let Some(value) = lookup("UNCHAINED_REALM") {
            self.server.realm = value;
        }

        if let Some(value) = lookup("UNCHAINED_ENFORCE_CONTENT_TYPE") {
            self.server.enforce_content_type = value.trim().parse().map_err(|e| {
                invalid("UNCHAINED_ENFORCE_CONTENT_TYPE", format!("{value:?}: {e}"))
            })?;
        }

        if let Some(value) = lookup("UNCHAINED_DEFAULT_FORMAT") {
            self.server.default_format = value.trim().parse().map_err(|_| {
                invalid(
                    "UNCHAINED_DEFAULT_FORMAT",
                    format!("{value:?} is not json or yaml"),
                )
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let server = &self.server;
        if server.realm.is_empty() || server.realm.contains('"') {
            return Err(invalid(
                "server.realm",
                "must be non-empty and free of double quotes",
            ));
        }
        if server.token_keyword.is_empty() || server.token_keyword.contains(char::is_whitespace) {
            return Err(invalid(
                "server.token_keyword",
                "must be a single non-empty word",
            ));
        }
        if server.session_cookie.is_empty()
            || !server
                .session_cookie
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid(
                "server.session_cookie",
                "must be non-empty and use only letters, digits, '-' and '_'",
            ));
        }
        if server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes", "must be positive"));
        }
        tracing_subscriber::EnvFilter::try_new(&self.logging.filter)
            .map_err(|e| invalid("logging.filter", e.to_string()))?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// VIEW CONFIG
// ═══════════════════════════════════════════════════════════════════════════

/// Authentication, permission and negotiation policy for one handler.
///
/// The default authenticates nobody and allows everything.
#[derive(Clone)]
pub struct ViewConfig {
    authentication: Vec<Arc<dyn Authentication>>,
    permissions: Vec<Arc<dyn Permission>>,
    enforce_content_type: bool,
    default_format: Format,
    max_body_bytes: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            authentication: Vec::new(),
            permissions: vec![Arc::new(AllowAny)],
            enforce_content_type: false,
            default_format: Format::Json,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Negotiation settings from `server`; no schemes, allow-any permission.
    pub fn from_settings(server: &ServerSettings) -> Self {
        Self {
            enforce_content_type: server.enforce_content_type,
            default_format: server.default_format,
            max_body_bytes: server.max_body_bytes,
            ..Self::default()
        }
    }

    /// Append a scheme; schemes run in the order added.
    #[must_use]
    pub fn with_authentication(mut self, scheme: Arc<dyn Authentication>) -> Self {
        self.authentication.push(scheme);
        self
    }

    /// Replace the permission list. Every listed permission must grant.
    #[must_use]
    pub fn with_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Permission>>,
    {
        self.permissions = permissions.into_iter().collect();
        self
    }

    #[must_use]
    pub fn enforce_content_type(mut self, enforce: bool) -> Self {
        self.enforce_content_type = enforce;
        self
    }

    #[must_use]
    pub fn with_default_format(mut self, format: Format) -> Self {
        self.default_format = format;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn authentication(&self) -> &[Arc<dyn Authentication>] {
        &self.authentication
    }

    pub fn permissions(&self) -> &[Arc<dyn Permission>] {
        &self.permissions
    }

    pub const fn enforces_content_type(&self) -> bool {
        self.enforce_content_type
    }

    pub const fn default_format(&self) -> Format {
        self.default_format
    }

    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}
