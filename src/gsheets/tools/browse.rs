//! Dynamic choices for the tab selector of the configuration form.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::gsheets::tools::config::PluginConfig;
use crate::gsheets::tools::credentials::{Credentials, resolve_credentials};
use crate::gsheets::tools::error::Result;
use crate::gsheets::tools::sheets::{SheetsApi, SheetsSession};

/// Parameter listing worksheet titles.
pub const TABS_PARAMETER: &str = "tabs_ids";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Answer sent back to the form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Choices {
    pub choices: Vec<Choice>,
}

impl Choices {
    /// Single label-only choice carrying a message for the user.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                label: message.into(),
                value: None,
            }],
        }
    }

    pub fn from_titles<I: IntoIterator<Item = String>>(titles: I) -> Self {
        Self {
            choices: titles
                .into_iter()
                .map(|title| Choice {
                    label: title.clone(),
                    value: Some(title),
                })
                .collect(),
        }
    }
}

/// Lists the worksheet titles of the configured document. Never fails:
/// every problem becomes a one-item choice list carrying the message.
pub fn browse_tabs<A, F>(payload: &Value, config: &Value, connect: F) -> Choices
where
    A: SheetsApi,
    F: FnOnce(&Credentials) -> Result<SheetsSession<A>>,
{
    let config = config.get("config").unwrap_or(config);
    let config = match PluginConfig::from_value(config) {
        Ok(config) => config,
        Err(err) => return Choices::message(err.to_string()),
    };
    if config.auth_type.is_none() && config.credentials.is_none() {
        return Choices::message("Select a type of authentication");
    }
    let credentials = match resolve_credentials(&config) {
        Ok(credentials) => credentials,
        Err(message) => return Choices::message(message),
    };

    let parameter_name = payload.get("parameterName").and_then(Value::as_str);
    let doc_id = payload
        .get("rootModel")
        .and_then(|root| root.get("doc_id"))
        .and_then(Value::as_str)
        .filter(|doc_id| !doc_id.is_empty());
    let Some(doc_id) = doc_id else {
        return Choices::message("Please set the document id");
    };
    if parameter_name != Some(TABS_PARAMETER) {
        return Choices::default();
    }

    let titles = connect(&credentials).and_then(|session| {
        let worksheets = session.open_worksheets(doc_id, &[])?;
        Ok(worksheets
            .iter()
            .map(|worksheet| worksheet.title().to_string())
            .collect::<Vec<_>>())
    });
    match titles {
        Ok(titles) => Choices::from_titles(titles),
        Err(err) => {
            warn!(%err, "could not list worksheets");
            Choices::message(err.to_string())
        }
    }
}
