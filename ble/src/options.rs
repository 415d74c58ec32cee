use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client Characteristic Configuration Descriptor.
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x0000_2902_0000_1000_8000_0080_5f9b_34fb);

/// Descriptor value enabling notifications.
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];
/// Descriptor value enabling indications.
pub const ENABLE_INDICATION_VALUE: [u8; 2] = [0x02, 0x00];
/// Descriptor value disabling both.
pub const DISABLE_NOTIFICATION_VALUE: [u8; 2] = [0x00, 0x00];

/// Adapter configuration applied at `openBluetoothAdapter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BleOptions {
    /// Reconnect automatically after a link loss.
    pub auto_connect: bool,
    /// Connection attempts before giving up.
    pub connect_failed_retry_count: u32,
    /// Per-attempt connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// How long one scan runs, in milliseconds.
    pub scan_period_ms: u64,
    /// Default service for operations that omit one.
    pub service_uuid: Uuid,
    /// Default write characteristic.
    pub write_uuid: Uuid,
    /// Default notify characteristic.
    pub notify_uuid: Uuid,
}

impl BleOptions {
    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Scan duration.
    #[must_use]
    pub const fn scan_period(&self) -> Duration {
        Duration::from_millis(self.scan_period_ms)
    }
}

impl Default for BleOptions {
    fn default() -> Self {
        Self {
            auto_connect: false,
            connect_failed_retry_count: 10,
            connect_timeout_ms: 10_000,
            scan_period_ms: 12_000,
            service_uuid: Uuid::from_u128(0x0000_ff00_0000_1000_8000_0080_5f9b_34fb),
            write_uuid: Uuid::from_u128(0x0000_ff01_0000_1000_8000_0080_5f9b_34fb),
            notify_uuid: Uuid::from_u128(0x0000_ff02_0000_1000_8000_0080_5f9b_34fb),
        }
    }
}
