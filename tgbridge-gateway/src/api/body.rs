//! Field-by-field access to JSON request bodies
//!
//! Bodies are read into a JSON object once and each field is extracted on
//! its own, so one badly typed field never hides the others.

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::AccountId;
use crate::error::{Error, Result};

/// A request body viewed as a JSON object
///
/// Empty, unparsable and non-object bodies are all read as `{}`.
#[derive(Debug, Default)]
pub struct JsonBody(Map<String, Value>);

impl JsonBody {
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Self(fields),
            Ok(other) => {
                debug!("Ignoring non-object request body ({})", json_type(&other));
                Self::default()
            }
            Err(e) => {
                debug!("Ignoring unparsable request body: {}", e);
                Self::default()
            }
        }
    }

    /// Field as text; numbers are accepted and rendered in decimal
    ///
    /// `null` and a missing key are `Ok(None)`. Booleans, arrays and objects
    /// are a 400.
    pub fn text(&self, field: &str) -> Result<Option<String>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(Error::BadRequest(format!(
                "{field} must be a string or number, got {}",
                json_type(other)
            ))),
        }
    }

    /// Field as an account id (number or numeric string), `None` otherwise
    pub fn account_id(&self, field: &str) -> Option<AccountId> {
        self.0
            .get(field)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
