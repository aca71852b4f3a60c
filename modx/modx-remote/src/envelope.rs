//! The uniform `{success, data, error}` response shape of the remote API.

use modx_core::error::{ModxError, Result};
use modx_core::types::ElementDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when the remote reports failure without saying why.
pub const GENERIC_FAILURE: &str = "Something went wrong";

/// A remote response, surfaced as-is; callers decide what `success` means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Remote error text, or a generic message.
    pub fn error_message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(GENERIC_FAILURE)
    }

    /// Turn a non-success envelope into a `RemoteFailure`.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ModxError::remote(self.error_message()))
        }
    }

    /// The `data.content` field rendered as text.
    ///
    /// `None` when the field is absent or null; non-string values use their
    /// JSON text.
    pub fn content(&self) -> Option<String> {
        match self.data.get("content")? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// `data` as a list of elements; anything but an array is an empty list.
    pub fn elements(&self) -> Result<Vec<ElementDescriptor>> {
        match &self.data {
            Value::Array(_) => Ok(serde_json::from_value(self.data.clone())?),
            _ => Ok(Vec::new()),
        }
    }

    /// `data` as a single element.
    pub fn element(&self) -> Result<ElementDescriptor> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_fields_default() {
        let env = envelope(json!({}));
        assert!(!env.success);
        assert_eq!(env.data, Value::Null);
        assert_eq!(env.error_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_into_result() {
        let ok = envelope(json!({"success": true, "data": {"id": 1}}));
        assert_eq!(ok.into_result().unwrap()["id"], 1);

        let err = envelope(json!({"success": false, "error": "Name taken"}));
        assert_eq!(
            err.into_result().unwrap_err().to_string(),
            "Remote failure: Name taken"
        );
    }

    #[test]
    fn test_content_variants() {
        assert_eq!(
            envelope(json!({"success": true, "data": {"content": "<p>"}})).content(),
            Some("<p>".to_string())
        );
        assert_eq!(
            envelope(json!({"success": true, "data": {"content": null}})).content(),
            None
        );
        assert_eq!(envelope(json!({"success": true, "data": {}})).content(), None);
        assert_eq!(
            envelope(json!({"success": true, "data": {"content": 42}})).content(),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_elements_requires_array() {
        let list = envelope(json!({"success": true, "data": [{"id": 1, "name": "a"}]}));
        assert_eq!(list.elements().unwrap().len(), 1);

        let object = envelope(json!({"success": true, "data": {"id": 1}}));
        assert!(object.elements().unwrap().is_empty());
    }
}
