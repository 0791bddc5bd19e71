//! Typed view over the plugin configuration mapping.
//!
//! The host hands every component the same loosely structured JSON mapping.
//! [`PluginConfig`] deserialises the keys the tool understands and leaves the
//! discriminators whose unknown values must be reported later (`auth_type`,
//! `result_format`) as plain strings.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::gsheets::tools::error::{Result, ToolError};

/// Batch size used by the batched recipe when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 200;
/// Batch size of the legacy append recipe.
pub const LEGACY_BATCH_SIZE: usize = 50;

/// Configuration mapping shared by the connector, recipes, importer and
/// tab picker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub auth_type: Option<String>,
    pub credentials: Option<String>,
    pub preset_credentials_service_account: Option<Map<String, Value>>,
    pub oauth_credentials: Option<Map<String, Value>>,
    pub doc_id: Option<String>,
    pub tab_id: Option<String>,
    pub tabs_ids: Option<Vec<String>>,
    pub result_format: Option<String>,
    pub write_format: Option<ValueInputOption>,
    pub insert_format: Option<ValueInputOption>,
    pub write_mode: Option<WriteMode>,
    pub batch_size: Option<usize>,
    /// Pause between append batches, in hundredths of a second.
    pub insertion_delay: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub add_sheet_name_column: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub lines_to_skip: usize,
    /// Send the captured header row with the first appended batch.
    #[serde(deserialize_with = "null_as_default")]
    pub append_header: bool,
    pub creation_mode: Option<CreationMode>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_dry_run: bool,
}

/// Hosts send `null` for flags and counters the user never touched.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PluginConfig {
    /// Deserialises a configuration mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Reads a configuration mapping from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&data)?;
        Self::from_value(&value)
    }

    /// Selected tab titles. A non-empty `tabs_ids` wins over the legacy
    /// single `tab_id`.
    pub fn tab_ids(&self) -> Vec<String> {
        match &self.tabs_ids {
            Some(tabs) if !tabs.is_empty() => tabs.clone(),
            _ => self
                .tab_id
                .iter()
                .filter(|tab| !tab.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Document id, failing with a configuration error when missing.
    pub fn require_doc_id(&self) -> Result<&str> {
        match self.doc_id.as_deref() {
            Some(doc_id) if !doc_id.trim().is_empty() => Ok(doc_id),
            _ => Err(ToolError::Config("The document id is not provided".into())),
        }
    }

    /// Value input mode used by the recipes.
    pub fn insert_option(&self) -> ValueInputOption {
        self.insert_format
            .or(self.write_format)
            .unwrap_or_default()
    }

    /// Delay applied before each append call.
    pub fn insertion_pause(&self) -> Duration {
        Duration::from_millis(self.insertion_delay.unwrap_or(0) * 10)
    }
}

/// Shape of the records produced by the read connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    FirstRowHeader,
    NoHeader,
    Json,
}

impl FromStr for ResultFormat {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "first-row-header" => Ok(ResultFormat::FirstRowHeader),
            "no-header" => Ok(ResultFormat::NoHeader),
            "json" => Ok(ResultFormat::Json),
            other => Err(ToolError::Unimplemented(format!(
                "result format '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultFormat::FirstRowHeader => write!(f, "first-row-header"),
            ResultFormat::NoHeader => write!(f, "no-header"),
            ResultFormat::Json => write!(f, "json"),
        }
    }
}

/// How the Sheets API interprets written values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueInputOption {
    /// Values are stored verbatim.
    #[default]
    #[serde(rename = "RAW")]
    Raw,
    /// Values are parsed as if typed in the sheet UI.
    #[serde(rename = "USER_ENTERED")]
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// Destination strategy of the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    #[serde(alias = "APPEND")]
    Append,
    #[serde(alias = "OVERWRITE")]
    Overwrite,
}

/// Importer policy applied when the target dataset name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationMode {
    /// Create a fresh dataset under the next free name.
    CreateNew,
    /// Leave the existing dataset untouched.
    Skip,
    /// Rewrite the existing dataset.
    #[default]
    UpdateExisting,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plural_tabs_override_legacy_tab() {
        let config = PluginConfig::from_value(&json!({
            "tab_id": "old",
            "tabs_ids": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(config.tab_ids(), vec!["a", "b"]);
    }

    #[test]
    fn empty_tabs_fall_back_to_legacy_tab() {
        let config = PluginConfig::from_value(&json!({"tab_id": "old", "tabs_ids": []})).unwrap();
        assert_eq!(config.tab_ids(), vec!["old"]);

        let config = PluginConfig::from_value(&json!({})).unwrap();
        assert!(config.tab_ids().is_empty());
    }

    #[test]
    fn parses_enumerations() {
        let config = PluginConfig::from_value(&json!({
            "write_format": "USER_ENTERED",
            "write_mode": "OVERWRITE",
            "creation_mode": "skip",
            "insertion_delay": 25
        }))
        .unwrap();
        assert_eq!(config.insert_option(), ValueInputOption::UserEntered);
        assert_eq!(config.write_mode, Some(WriteMode::Overwrite));
        assert_eq!(config.creation_mode, Some(CreationMode::Skip));
        assert_eq!(config.insertion_pause(), Duration::from_millis(250));
    }

    #[test]
    fn null_flags_and_counters_take_their_defaults() {
        let config = PluginConfig::from_value(&json!({
            "doc_id": "d",
            "lines_to_skip": null,
            "add_sheet_name_column": null,
            "append_header": null,
            "is_dry_run": null
        }))
        .unwrap();
        assert_eq!(config.lines_to_skip, 0);
        assert!(!config.add_sheet_name_column);
        assert!(!config.append_header);
        assert!(!config.is_dry_run);

        let config = PluginConfig::from_value(&json!({
            "lines_to_skip": 2,
            "add_sheet_name_column": true
        }))
        .unwrap();
        assert_eq!(config.lines_to_skip, 2);
        assert!(config.add_sheet_name_column);
    }

    #[test]
    fn unknown_result_format_is_unimplemented() {
        let error = "xml".parse::<ResultFormat>().unwrap_err();
        assert!(matches!(error, ToolError::Unimplemented(_)));
    }
}
