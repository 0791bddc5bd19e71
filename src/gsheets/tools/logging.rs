use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::gsheets::tools::error::{Result, ToolError};

/// Configuration keys whose values never reach the logs.
pub const SECRET_KEYS: [&str; 2] = ["credentials", "access_token"];

const REDACTED: &str = "**********";

/// Installs the global subscriber. `RUST_LOG` wins over `verbosity`
/// (0 → info, 1 → debug, 2+ → trace).
pub fn init(verbosity: u8) -> Result<()> {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

/// Copy of `value` with every secret key masked, at any depth.
pub fn redact_secrets(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let inner = if SECRET_KEYS.contains(&key.as_str()) && !inner.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_secrets(inner)
                    };
                    (key.clone(), inner)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_secrets).collect()),
        other => other.clone(),
    }
}
