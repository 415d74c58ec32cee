use thiserror::Error;

use crate::code::ErrorCode;
use crate::envelope::Envelope;

/// Errors a plugin reports back through `on_error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Params were not valid JSON or missed a required field.
    #[error("invalid params: {0}")]
    ParamParse(String),

    /// A device, service, characteristic or id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The user refused a permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The operation did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The platform reported a failure.
    #[error("system error: {0}")]
    System(String),

    /// The operation is not available here.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A failure with an explicit result code.
    #[error("{message}")]
    Coded {
        /// Result code sent to web content.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

impl BridgeError {
    /// Creates a [`BridgeError::Coded`] error.
    pub fn coded(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Coded {
            code,
            message: message.into(),
        }
    }

    /// Result code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ParamParse(_) => ErrorCode::InvalidData,
            Self::NotFound(_) => ErrorCode::DeviceNotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Timeout(_) => ErrorCode::OperateTimeOut,
            Self::System(_) => ErrorCode::SystemError,
            Self::Unsupported(_) => ErrorCode::SystemNotSupport,
            Self::Coded { code, .. } => *code,
        }
    }

    /// The error as a failure envelope.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope::failure(self.code(), Some(self.to_string()))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParamParse(err.to_string())
    }
}
