use async_channel::Sender;
use async_trait::async_trait;
use uuid::Uuid;

use crate::options::BleOptions;
use crate::properties::CharacteristicProperties;
use crate::BleError;

/// A peripheral seen during a scan or currently connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleDevice {
    /// Platform address, the id web content uses.
    pub device_id: String,
    /// Advertised name, if any.
    pub name: Option<String>,
    /// Signal strength at discovery; `0` when unknown.
    pub rssi: i32,
}

/// A GATT service and its characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// Service UUID.
    pub uuid: Uuid,
    /// Whether this is a primary service.
    pub is_primary: bool,
    /// Characteristics of the service.
    pub characteristics: Vec<GattCharacteristic>,
}

/// A GATT characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Supported operations.
    pub properties: CharacteristicProperties,
    /// UUIDs of attached descriptors.
    pub descriptors: Vec<Uuid>,
}

/// Radio state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterState {
    /// The device has a Bluetooth radio.
    pub supported: bool,
    /// The radio is switched on.
    pub enabled: bool,
    /// A scan is in progress.
    pub discovering: bool,
}

/// Things the radio reports on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleEvent {
    /// An advertisement was received. May repeat for the same device.
    DeviceFound(BleDevice),
    /// The scan period ended.
    ScanStopped,
    /// The scan could not run.
    ScanFailed(i32),
    /// A link came up or went down.
    ConnectionChanged {
        /// Peer address.
        device_id: String,
        /// Peer name, if known.
        name: Option<String>,
        /// New link state.
        connected: bool,
    },
    /// A subscribed characteristic changed.
    ValueChanged {
        /// Peer address.
        device_id: String,
        /// Characteristic that changed.
        characteristic: Uuid,
        /// New value.
        value: Vec<u8>,
    },
}

/// The platform BLE stack.
///
/// Every GATT operation goes through this trait; the plugin never reaches
/// into the stack any other way.
#[async_trait]
pub trait BleBackend: Send + Sync {
    /// Current radio state.
    fn adapter_state(&self) -> AdapterState;

    /// Brings the stack up with `options`. Unsolicited events go to `events`
    /// until [`BleBackend::release`].
    ///
    /// # Errors
    ///
    /// Returns [`BleError::System`] if the stack fails to start.
    async fn init(&self, options: &BleOptions, events: Sender<BleEvent>) -> Result<(), BleError>;

    /// Asks the user to switch the radio on.
    fn request_enable(&self) {}

    /// Starts a scan that stops by itself after `options.scan_period()`.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::ScanFailed`] if scanning is not possible.
    fn start_scan(&self, options: &BleOptions) -> Result<(), BleError>;

    /// Stops a running scan. No-op when idle.
    fn stop_scan(&self);

    /// Connects to `device_id` and waits until its services are ready.
    /// Returns the peer name.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::ConnectFailed`] when every attempt fails.
    async fn connect(&self, device_id: &str, options: &BleOptions) -> Result<Option<String>, BleError>;

    /// Drops the link to `device_id`.
    fn disconnect(&self, device_id: &str);

    /// Devices with a live link.
    fn connected_devices(&self) -> Vec<BleDevice>;

    /// GATT services of a connected device, running discovery first when
    /// none are cached.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotConnected`] if the link is gone.
    async fn services(&self, device_id: &str) -> Result<Vec<GattService>, BleError>;

    /// Writes `data` and returns the value the stack reports afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::WriteFailed`] with the platform status on failure.
    async fn write_characteristic(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<Vec<u8>, BleError>;

    /// Turns local delivery of value changes on or off. Returns `false` if
    /// the stack refuses.
    fn set_characteristic_notification(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
        enable: bool,
    ) -> bool;

    /// Writes a descriptor value.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::System`] if the write request is rejected.
    async fn write_descriptor(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), BleError>;

    /// Releases the stack. [`BleBackend::init`] must run again before use.
    fn release(&self);
}
