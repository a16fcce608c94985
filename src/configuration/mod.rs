use std::fmt;
use std::fs;
use std::path::Path;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

mod error;

use crate::auth::Decision;
use crate::secret::Secret;
pub use error::Error;

/// Prefix the broker puts in front of plugin option keys in its own configuration file.
const OPTION_PREFIX: &str = "plugin_opt_";

/// How the connecting username is checked against, or replaced by, introspection claims.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UsernameMode {
    #[default]
    None,
    OidcUsername,
    OidcEmail,
    OidcSub,
    Template,
}

impl UsernameMode {
    /// Claim compared against (or copied into) the username by the `oidc-*` modes.
    pub fn claim_name(self) -> Option<&'static str> {
        match self {
            UsernameMode::OidcUsername => Some("username"),
            UsernameMode::OidcEmail => Some("email"),
            UsernameMode::OidcSub => Some("sub"),
            UsernameMode::None | UsernameMode::Template => None,
        }
    }
}

impl fmt::Display for UsernameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            UsernameMode::None => "none",
            UsernameMode::OidcUsername => "oidc-username",
            UsernameMode::OidcEmail => "oidc-email",
            UsernameMode::OidcSub => "oidc-sub",
            UsernameMode::Template => "template",
        };
        f.write_str(name)
    }
}

/// Outcome applied when a check fails: reject outright, or abstain so that another
/// authentication mechanism of the broker decides.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureAction {
    Deny,
    Defer,
}

impl FailureAction {
    pub fn decision(self) -> Decision {
        match self {
            FailureAction::Deny => Decision::Deny,
            FailureAction::Defer => Decision::Defer,
        }
    }
}

impl fmt::Display for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureAction::Deny => f.write_str("deny"),
            FailureAction::Defer => f.write_str("defer"),
        }
    }
}

/// Resolved policy shared by every authentication attempt. Built once, never mutated.
#[derive(Clone, Debug, Deserialize)]
pub struct Configuration {
    pub introspection_endpoint: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    #[serde(default = "Configuration::default_tls_verification")]
    pub tls_verification: bool,
    #[serde(default = "Configuration::default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub username_validation: UsernameMode,
    #[serde(default)]
    pub username_validation_template: Option<String>,
    #[serde(default = "Configuration::default_username_validation_error")]
    pub username_validation_error: FailureAction,
    #[serde(default)]
    pub username_replacement: UsernameMode,
    #[serde(default)]
    pub username_replacement_template: Option<String>,
    #[serde(default = "Configuration::default_username_replacement_error")]
    pub username_replacement_error: FailureAction,
    #[serde(default = "Configuration::default_token_verification_error")]
    pub token_verification_error: FailureAction,
}

impl Configuration {
    fn default_tls_verification() -> bool {
        true
    }

    fn default_timeout() -> u64 {
        5
    }

    fn default_username_validation_error() -> FailureAction {
        FailureAction::Defer
    }

    fn default_username_replacement_error() -> FailureAction {
        FailureAction::Deny
    }

    fn default_token_verification_error() -> FailureAction {
        FailureAction::Deny
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path)?;
        Self::load_from_str(&config_str)
    }

    pub fn load_from_str(slice: &str) -> Result<Self, Error> {
        let config: Configuration = toml::from_str(slice)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from the `key value` option pairs a broker hands to its
    /// plugins. Keys may carry the `plugin_opt_` prefix. Unknown keys are ignored.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = toml::Table::new();

        for (key, value) in options {
            let key = key.as_ref();
            let key = key.strip_prefix(OPTION_PREFIX).unwrap_or(key);
            let value = value.as_ref();

            let value = match key {
                "tls_verification" => toml::Value::Boolean(parse_bool(key, value)?),
                "timeout" => toml::Value::Integer(parse_integer(key, value)?),
                "introspection_endpoint"
                | "client_id"
                | "client_secret"
                | "username_validation"
                | "username_validation_template"
                | "username_validation_error"
                | "username_replacement"
                | "username_replacement_template"
                | "username_replacement_error"
                | "token_verification_error" => toml::Value::String(value.to_string()),
                _ => {
                    warn!("Ignoring unknown option '{key}'");
                    continue;
                }
            };

            table.insert(key.to_string(), value);
        }

        for key in ["introspection_endpoint", "client_id", "client_secret"] {
            if !table.contains_key(key) {
                return Err(Error::MissingOption(key));
            }
        }

        let config: Configuration = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.introspection_endpoint.is_empty() {
            return Err(Error::MissingOption("introspection_endpoint"));
        }
        if self.client_id.is_empty() {
            return Err(Error::MissingOption("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(Error::MissingOption("client_secret"));
        }

        match Url::parse(&self.introspection_endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(Error::InvalidOption {
                    key: "introspection_endpoint".to_string(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Err(e) => {
                return Err(Error::InvalidOption {
                    key: "introspection_endpoint".to_string(),
                    reason: e.to_string(),
                });
            }
        }

        if self.timeout == 0 {
            return Err(Error::InvalidOption {
                key: "timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.username_validation == UsernameMode::Template
            && self.username_validation_template.is_none()
        {
            warn!("username_validation is 'template' but no username_validation_template is set");
        }
        if self.username_replacement == UsernameMode::Template
            && self.username_replacement_template.is_none()
        {
            warn!("username_replacement is 'template' but no username_replacement_template is set");
        }

        Ok(())
    }

    pub fn log_summary(&self) {
        info!("Introspection endpoint: {}", self.introspection_endpoint);
        debug!(
            "TLS verification: {}",
            if self.tls_verification {
                "<Enabled>"
            } else {
                "<Disabled>"
            }
        );
        debug!("Timeout: {} seconds", self.timeout);
        debug!("OAuth2 client ID: {}", self.client_id);
        debug!("OAuth2 client secret: {} chars", self.client_secret.len());
        debug!("Username validation: {}", self.username_validation);
        debug!(
            "Username validation template: {}",
            self.username_validation_template.as_deref().unwrap_or("<None>")
        );
        debug!("Username validation error: <{}>", self.username_validation_error);
        debug!("Username replacement: {}", self.username_replacement);
        debug!(
            "Username replacement template: {}",
            self.username_replacement_template.as_deref().unwrap_or("<None>")
        );
        debug!("Username replacement error: <{}>", self.username_replacement_error);
        debug!("Token verification error: <{}>", self.token_verification_error);
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    value.trim().parse().map_err(|_| Error::InvalidOption {
        key: key.to_string(),
        reason: format!("expected 'true' or 'false', got '{value}'"),
    })
}

fn parse_integer(key: &str, value: &str) -> Result<i64, Error> {
    value.trim().parse().map_err(|_| Error::InvalidOption {
        key: key.to_string(),
        reason: format!("expected an integer, got '{value}'"),
    })
}
