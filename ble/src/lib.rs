//! Bluetooth Low Energy for web content.
//!
//! [`BlePlugin`] exposes the mini-program style BLE API (`openBluetoothAdapter`,
//! `createBLEConnection`, `writeBLECharacteristicValue`, ...) over the bridge.
//! Radio access goes through a [`BleBackend`] supplied by the host. Results
//! use the `{code, message, data}` envelope; unsolicited events are pushed to
//! web content under the plugin name with an `eventName` field.

#![warn(missing_docs)]

mod backend;
mod options;
pub mod payload;
mod plugin;
mod properties;

pub use backend::{AdapterState, BleBackend, BleDevice, BleEvent, GattCharacteristic, GattService};
pub use options::{
    BleOptions, CCCD_UUID, DISABLE_NOTIFICATION_VALUE, ENABLE_INDICATION_VALUE,
    ENABLE_NOTIFICATION_VALUE,
};
pub use payload::{ValueType, WriteRequest};
pub use plugin::{BlePlugin, PLUGIN_NAME};
pub use properties::CharacteristicProperties;

use bridgekit_bridge::{BridgeError, ErrorCode};
use thiserror::Error;

/// Names of the events pushed to web content.
pub mod events {
    /// A new device turned up during a scan.
    pub const DEVICE_FOUND: &str = "onBluetoothDeviceFound";
    /// A link came up or went down.
    pub const CONNECTION_STATE_CHANGE: &str = "onBLEConnectionStateChange";
    /// A subscribed characteristic changed.
    pub const CHARACTERISTIC_VALUE_CHANGE: &str = "onBLECharacteristicValueChange";
    /// Notifications were switched on or off.
    pub const NOTIFICATION_STATE_CHANGE: &str = "onBLENotificationStateChange";
    /// A characteristic write completed.
    pub const WRITE_CHARACTERISTIC_VALUE_RESULT: &str = "onBLEWriteCharacteristicValueResult";
}

/// Errors that can occur in BLE operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleError {
    /// `openBluetoothAdapter` has not succeeded yet.
    #[error("bluetooth adapter is not initialized")]
    NotInit,
    /// The radio is switched off.
    #[error("bluetooth adapter is unavailable")]
    NotAvailable,
    /// The device has no Bluetooth radio.
    #[error("bluetooth is not supported on this device")]
    Unsupported,
    /// Bluetooth permission was refused.
    #[error("bluetooth permission denied")]
    PermissionDenied,
    /// The device was not seen in the last scan.
    #[error("device {0} was not found by the scan")]
    DeviceNotFound(String),
    /// The device has no live link.
    #[error("device {0} is not connected")]
    NotConnected(String),
    /// The device has no such service.
    #[error("service {0} not found")]
    NoService(String),
    /// The service has no such characteristic or descriptor.
    #[error("characteristic {0} not found")]
    NoCharacteristic(String),
    /// The characteristic does not support the operation.
    #[error("{0}")]
    PropertyNotSupported(String),
    /// Params did not describe a valid operation.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Every connection attempt failed.
    #[error("connection failed with status {0}")]
    ConnectFailed(i32),
    /// Scanning is not possible.
    #[error("scan failed with status {0}")]
    ScanFailed(i32),
    /// The peer rejected a write.
    #[error("write failed with status {0}")]
    WriteFailed(i32),
    /// Any other stack failure.
    #[error("{0}")]
    System(String),
}

impl BleError {
    /// Result code reported to web content.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInit => ErrorCode::NotInit,
            Self::NotAvailable => ErrorCode::NotAvailable,
            Self::Unsupported => ErrorCode::SystemNotSupport,
            Self::PermissionDenied => ErrorCode::PermissionDenied,
            Self::DeviceNotFound(_) | Self::NotConnected(_) => ErrorCode::DeviceNotFound,
            Self::NoService(_) => ErrorCode::NoService,
            Self::NoCharacteristic(_) => ErrorCode::NoCharacteristic,
            Self::PropertyNotSupported(_) => ErrorCode::PropertyNotSupport,
            Self::InvalidData(_) => ErrorCode::InvalidData,
            Self::ConnectFailed(_) => ErrorCode::ConnectTimeout,
            Self::ScanFailed(_) => ErrorCode::ScanNotAvailable,
            Self::WriteFailed(_) => ErrorCode::WriteNotSupported,
            Self::System(_) => ErrorCode::SystemError,
        }
    }
}

impl From<BleError> for BridgeError {
    fn from(err: BleError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}
