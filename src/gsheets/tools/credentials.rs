use std::fmt;

use serde_json::{Map, Value};

use crate::gsheets::tools::config::PluginConfig;
use crate::gsheets::tools::error::{Result, ToolError};

const LEGACY_SERVICE_ACCOUNT: &str = "legacy-service-account";
const PRESET_SERVICE_ACCOUNT: &str = "preset-service-account";
const SINGLE_SIGN_ON: &str = "single-sign-on";

const NO_AUTHENTICATION_SELECTED: &str = "Please select a type of authentication";

/// Kind of secret handed to the Sheets session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// JSON key of a Google service account (inline or as a file path).
    ServiceAccount,
    /// OAuth access token of an end user.
    PersonalAccount,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ServiceAccount => write!(f, "service-account"),
            CredentialKind::PersonalAccount => write!(f, "personal-account"),
        }
    }
}

/// Secret material resolved from the configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub secret: String,
    pub kind: CredentialKind,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret", &"**********")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Resolves credentials according to `auth_type`, failing with the
/// message matching the selected mode.
pub fn extract_credentials(config: &PluginConfig) -> Result<Credentials> {
    resolve_credentials(config).map_err(ToolError::Credentials)
}

/// Same resolution as [`extract_credentials`], returning the message
/// instead of an error. Used by the tab picker, which must never fail.
pub fn resolve_credentials(config: &PluginConfig) -> std::result::Result<Credentials, String> {
    let auth_type = config.auth_type.as_deref();
    let kind = match auth_type {
        None | Some(LEGACY_SERVICE_ACCOUNT) | Some(PRESET_SERVICE_ACCOUNT) => {
            Some(CredentialKind::ServiceAccount)
        }
        Some(SINGLE_SIGN_ON) => Some(CredentialKind::PersonalAccount),
        Some(_) => None,
    };

    let secret = match auth_type {
        None | Some(LEGACY_SERVICE_ACCOUNT) => config.credentials.clone(),
        Some(PRESET_SERVICE_ACCOUNT) => {
            let preset = non_empty(config.preset_credentials_service_account.as_ref())
                .ok_or_else(|| "There is no service account preset selected.".to_string())?;
            string_field(preset, "credentials")
        }
        Some(SINGLE_SIGN_ON) => {
            let preset = non_empty(config.oauth_credentials.as_ref())
                .ok_or_else(|| "There is no Single Sign On preset selected.".to_string())?;
            string_field(preset, "access_token")
        }
        Some(_) => None,
    };

    match (secret, kind) {
        (Some(secret), Some(kind)) if !secret.is_empty() => Ok(Credentials { secret, kind }),
        _ => Err(empty_credentials_message(auth_type).to_string()),
    }
}

fn empty_credentials_message(auth_type: Option<&str>) -> &'static str {
    match auth_type {
        Some(LEGACY_SERVICE_ACCOUNT) => "Your Service Account credentials section is empty",
        Some(PRESET_SERVICE_ACCOUNT) => "The selected service account preset is empty",
        Some(SINGLE_SIGN_ON) => "There is a problem with the selected Single Sign On preset",
        _ => NO_AUTHENTICATION_SELECTED,
    }
}

fn non_empty(map: Option<&Map<String, Value>>) -> Option<&Map<String, Value>> {
    map.filter(|map| !map.is_empty())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Null => None,
        // Presets may hold the service account key as a JSON object.
        other => Some(other.to_string()),
    }
}
