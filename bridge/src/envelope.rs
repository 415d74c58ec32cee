use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::code::ErrorCode;

/// The `{code, message, data}` result shape every plugin answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `0` on success, an [`ErrorCode`] value otherwise.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Payload, an empty object when there is none.
    pub data: Value,
}

impl Envelope {
    /// Successful envelope carrying `data` (an empty object when `None`).
    pub fn success(data: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success.code(),
            message: message.into(),
            data: data.unwrap_or_else(empty_object),
        }
    }

    /// Failed envelope; `message` overrides the code's default message.
    pub fn failure(code: ErrorCode, message: Option<String>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_owned()),
            data: empty_object(),
        }
    }

    /// Whether `code` is `0`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == 0
    }

    /// The envelope as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "code": self.code,
            "message": self.message,
            "data": self.data,
        })
    }

    /// The envelope serialised as a JSON string, the form `on_error` carries.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_defaults_to_empty_data() {
        let envelope = Envelope::success(None, "done");
        assert!(envelope.is_success());
        assert_eq!(envelope.to_value(), json!({"code": 0, "message": "done", "data": {}}));
    }

    #[test]
    fn failure_uses_default_message() {
        let envelope = Envelope::failure(ErrorCode::NoService, None);
        assert_eq!(envelope.code, 10004);
        assert_eq!(envelope.message, "no service");

        let custom = Envelope::failure(ErrorCode::DeviceNotFound, Some("gone".into()));
        assert_eq!(custom.code, -3);
        assert_eq!(custom.message, "gone");
    }

    #[test]
    fn json_string_parses_back() {
        let envelope = Envelope::failure(ErrorCode::OperateTimeOut, None);
        let parsed: Envelope = serde_json::from_str(&envelope.to_json_string()).unwrap();
        assert_eq!(parsed, envelope);
    }
}
