use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_channel::{Receiver, unbounded};
use bridgekit_bridge::{
    BridgeContext, BridgeError, Envelope, Plugin, Reply, SharedCallback, parse_params,
    params_object,
};
use bridgekit_permission::{Permission, PermissionBroker, PermissionError, PermissionStatus};
use log::{debug, info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::{BleBackend, BleDevice, BleEvent};
use crate::options::{
    BleOptions, CCCD_UUID, DISABLE_NOTIFICATION_VALUE, ENABLE_INDICATION_VALUE,
    ENABLE_NOTIFICATION_VALUE,
};
use crate::payload::WriteRequest;
use crate::properties::CharacteristicProperties;
use crate::{BleError, events};

/// Name web content addresses the plugin by.
pub const PLUGIN_NAME: &str = "QXBlePlugin";

const METHODS: [&str; 12] = [
    "openBluetoothAdapter",
    "startBluetoothDevicesDiscovery",
    "stopBluetoothDevicesDiscovery",
    "createBLEConnection",
    "getBLEDeviceServices",
    "getBLEDeviceCharacteristics",
    "closeBLEConnection",
    "writeBLECharacteristicValue",
    "notifyBLECharacteristicValueChange",
    "closeBluetoothAdapter",
    "getBluetoothAdapterState",
    "getBluetoothDevices",
];

/// Bluetooth base UUID; 16- and 32-bit ids are offsets into it.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

type Answer = Result<Envelope, BleError>;

/// The BLE bridge plugin.
pub struct BlePlugin {
    shared: Arc<Shared>,
}

struct Shared {
    backend: Arc<dyn BleBackend>,
    permissions: PermissionBroker,
    options: BleOptions,
    initialized: AtomicBool,
    scanned: Mutex<Vec<BleDevice>>,
    notifying: Mutex<HashSet<(String, Uuid)>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceParams {
    #[serde(default)]
    device_id: String,
    #[serde(default)]
    service_id: Option<String>,
}

impl DeviceParams {
    fn device_id(&self) -> Result<String, BleError> {
        let id = self.device_id.trim();
        if id.is_empty() {
            return Err(BleError::InvalidData("deviceId must not be empty".into()));
        }
        Ok(id.to_owned())
    }

    fn service_filter(&self) -> Result<Option<Uuid>, BleError> {
        self.service_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(parse_uuid)
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotifyParams {
    device_id: String,
    service_id: String,
    characteristic_id: String,
    enable: bool,
}

impl BlePlugin {
    /// Creates the plugin. Nothing touches the radio until
    /// `openBluetoothAdapter`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn BleBackend>,
        permissions: PermissionBroker,
        options: BleOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                permissions,
                options,
                initialized: AtomicBool::new(false),
                scanned: Mutex::new(Vec::new()),
                notifying: Mutex::new(HashSet::new()),
                pump: Mutex::new(None),
            }),
        }
    }

    /// Options applied at initialization.
    #[must_use]
    pub fn options(&self) -> &BleOptions {
        &self.shared.options
    }
}

impl Plugin for BlePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn execute(
        &self,
        ctx: &BridgeContext,
        method: &str,
        params: &str,
        callback: &SharedCallback,
    ) -> bool {
        if !METHODS.contains(&method) {
            return false;
        }
        debug!("{PLUGIN_NAME}.{method}");

        let reply = ctx.reply(callback);
        let shared = self.shared.clone();
        let task_ctx = ctx.clone();
        let name = method.to_owned();

        match method {
            "openBluetoothAdapter" => {
                spawn_answer(ctx, reply, name, async move {
                    shared.open_adapter(task_ctx).await
                });
            }
            "startBluetoothDevicesDiscovery" => {
                let result = params_object(params)
                    .map_err(invalid)
                    .and_then(|_| shared.start_scan());
                answer(reply, &name, result);
            }
            "stopBluetoothDevicesDiscovery" => answer(reply, &name, shared.stop_scan()),
            "createBLEConnection" => match parse::<DeviceParams>(params) {
                Ok(params) => spawn_answer(ctx, reply, name, async move {
                    shared.connect(params).await
                }),
                Err(err) => answer(reply, &name, Err(err)),
            },
            "getBLEDeviceServices" => match parse::<DeviceParams>(params) {
                Ok(params) => spawn_answer(ctx, reply, name, async move {
                    shared.services(params).await
                }),
                Err(err) => answer(reply, &name, Err(err)),
            },
            "getBLEDeviceCharacteristics" => match parse::<DeviceParams>(params) {
                Ok(params) => spawn_answer(ctx, reply, name, async move {
                    shared.characteristics(params).await
                }),
                Err(err) => answer(reply, &name, Err(err)),
            },
            "closeBLEConnection" => {
                let result =
                    parse::<DeviceParams>(params).and_then(|params| shared.close_connection(&params));
                answer(reply, &name, result);
            }
            "writeBLECharacteristicValue" => {
                match params_object(params)
                    .map_err(invalid)
                    .and_then(|map| WriteRequest::parse(&map))
                {
                    Ok(request) => spawn_answer(ctx, reply, name, async move {
                        shared.write(&task_ctx, request).await
                    }),
                    Err(err) => answer(reply, &name, Err(err)),
                }
            }
            "notifyBLECharacteristicValueChange" => match parse::<NotifyParams>(params) {
                Ok(params) => spawn_answer(ctx, reply, name, async move {
                    shared.notify(&task_ctx, params).await
                }),
                Err(err) => answer(reply, &name, Err(err)),
            },
            "closeBluetoothAdapter" => answer(reply, &name, shared.close_adapter()),
            "getBluetoothAdapterState" => {
                spawn_answer(ctx, reply, name, async move { shared.adapter_state().await });
            }
            "getBluetoothDevices" => answer(reply, &name, shared.devices()),
            _ => return false,
        }
        true
    }

    fn destroy(&self, _ctx: &BridgeContext) {
        self.shared.backend.stop_scan();
        lock(&self.shared.scanned).clear();
        lock(&self.shared.notifying).clear();
    }
}

impl fmt::Debug for BlePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlePlugin")
            .field("options", &self.shared.options)
            .field("initialized", &self.shared.initialized.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn require_init(&self) -> Result<(), BleError> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BleError::NotInit)
        }
    }

    fn require_connected(&self, device_id: &str) -> Result<BleDevice, BleError> {
        self.require_init()?;
        self.backend
            .connected_devices()
            .into_iter()
            .find(|device| device.device_id == device_id)
            .ok_or_else(|| BleError::NotConnected(device_id.to_owned()))
    }

    async fn open_adapter(self: Arc<Self>, ctx: BridgeContext) -> Answer {
        self.permissions
            .ensure(Permission::Bluetooth)
            .await
            .map_err(|err| match err {
                PermissionError::Denied => BleError::PermissionDenied,
                other => BleError::System(other.to_string()),
            })?;

        let (sink, events) = unbounded();
        self.backend.init(&self.options, sink).await?;
        self.initialized.store(true, Ordering::SeqCst);

        let pump = ctx.spawn(self.clone().pump(ctx.clone(), events));
        if let Some(previous) = lock(&self.pump).replace(pump) {
            previous.abort();
        }

        if !self.backend.adapter_state().enabled {
            info!("bluetooth is off, asking the user to switch it on");
            self.backend.request_enable();
        }
        Ok(Envelope::success(None, "bluetooth adapter opened"))
    }

    async fn pump(self: Arc<Self>, ctx: BridgeContext, events: Receiver<BleEvent>) {
        while let Ok(event) = events.recv().await {
            self.handle_event(&ctx, event);
        }
        debug!("ble event stream closed");
    }

    fn handle_event(&self, ctx: &BridgeContext, event: BleEvent) {
        match event {
            BleEvent::DeviceFound(device) => {
                if self.remember(&device) {
                    emit(ctx, events::DEVICE_FOUND, device_json(&device));
                }
            }
            BleEvent::ScanStopped => {
                debug!("scan finished with {} devices", lock(&self.scanned).len());
            }
            BleEvent::ScanFailed(status) => warn!("scan failed with status {status}"),
            BleEvent::ConnectionChanged {
                device_id,
                name,
                connected,
            } => {
                if !connected {
                    lock(&self.notifying).retain(|(id, _)| *id != device_id);
                }
                emit(
                    ctx,
                    events::CONNECTION_STATE_CHANGE,
                    json!({
                        "isConnected": connected,
                        "deviceId": device_id,
                        "name": name.unwrap_or_default(),
                    }),
                );
            }
            BleEvent::ValueChanged {
                device_id,
                characteristic,
                value,
            } => emit(
                ctx,
                events::CHARACTERISTIC_VALUE_CHANGE,
                json!({
                    "deviceId": device_id,
                    "characteristicId": characteristic.to_string(),
                    "value": hex::encode_upper(value),
                }),
            ),
        }
    }

    /// Adds `device` to the scan results. Returns `false` for repeats.
    fn remember(&self, device: &BleDevice) -> bool {
        let mut scanned = lock(&self.scanned);
        if scanned.iter().any(|known| known.device_id == device.device_id) {
            return false;
        }
        scanned.push(device.clone());
        true
    }

    fn start_scan(&self) -> Answer {
        self.require_init()?;
        lock(&self.scanned).clear();
        self.backend.start_scan(&self.options)?;
        Ok(Envelope::success(
            Some(json!({ "errMsg": "startBluetoothDevicesDiscovery:ok" })),
            "scan started",
        ))
    }

    fn stop_scan(&self) -> Answer {
        self.backend.stop_scan();
        Ok(Envelope::success(None, "scan stopped"))
    }

    async fn connect(&self, params: DeviceParams) -> Answer {
        self.require_init()?;
        let device_id = params.device_id()?;
        let scanned = lock(&self.scanned)
            .iter()
            .any(|device| device.device_id == device_id);
        if !scanned {
            return Err(BleError::DeviceNotFound(device_id));
        }

        let name = self.backend.connect(&device_id, &self.options).await?;
        info!("connected to {device_id}");
        Ok(Envelope::success(
            Some(json!({
                "deviceId": device_id,
                "name": name.unwrap_or_else(|| "unknown device".to_owned()),
            })),
            "device connected",
        ))
    }

    async fn services(&self, params: DeviceParams) -> Answer {
        let device_id = params.device_id()?;
        self.require_connected(&device_id)?;
        let services = self.backend.services(&device_id).await?;
        let list: Vec<Value> = services
            .iter()
            .map(|service| {
                json!({
                    "serviceId": service.uuid.to_string(),
                    "isPrimary": service.is_primary,
                })
            })
            .collect();
        let message = format!("found {} services", list.len());
        Ok(Envelope::success(Some(json!({ "services": list })), message))
    }

    async fn characteristics(&self, params: DeviceParams) -> Answer {
        let device_id = params.device_id()?;
        let filter = params.service_filter()?;
        self.require_connected(&device_id)?;

        let services = self.backend.services(&device_id).await?;
        if let Some(wanted) = filter {
            if !services.iter().any(|service| service.uuid == wanted) {
                return Err(BleError::NoService(wanted.to_string()));
            }
        }

        let notifying = lock(&self.notifying).clone();
        let mut list = Vec::new();
        for service in &services {
            if filter.is_some_and(|wanted| wanted != service.uuid) {
                continue;
            }
            for characteristic in &service.characteristics {
                list.push(json!({
                    "serviceId": service.uuid.to_string(),
                    "characteristicId": characteristic.uuid.to_string(),
                    "properties": characteristic.properties.names(),
                    "isNotifying": notifying.contains(&(device_id.clone(), characteristic.uuid)),
                }));
            }
        }
        let message = format!("found {} characteristics", list.len());
        Ok(Envelope::success(
            Some(json!({ "characteristics": list })),
            message,
        ))
    }

    fn close_connection(&self, params: &DeviceParams) -> Answer {
        let device_id = params.device_id()?;
        self.require_connected(&device_id)?;
        self.backend.disconnect(&device_id);
        lock(&self.notifying).retain(|(id, _)| *id != device_id);
        Ok(Envelope::success(None, "disconnected"))
    }

    async fn write(&self, ctx: &BridgeContext, request: WriteRequest) -> Answer {
        self.require_connected(&request.device_id)?;
        let service = parse_uuid(&request.service_id)?;
        let characteristic = parse_uuid(&request.characteristic_id)?;
        debug!(
            "writing {} bytes to {characteristic}: {}",
            request.data.len(),
            hex::encode_upper(&request.data)
        );

        let written = self
            .backend
            .write_characteristic(&request.device_id, service, characteristic, &request.data)
            .await?;
        let value = hex::encode_upper(written);
        emit(
            ctx,
            events::WRITE_CHARACTERISTIC_VALUE_RESULT,
            json!({
                "deviceId": request.device_id,
                "characteristicId": characteristic.to_string(),
                "value": value,
            }),
        );
        Ok(Envelope::success(
            Some(json!({
                "characteristicId": characteristic.to_string(),
                "value": value,
            })),
            "characteristic written",
        ))
    }

    async fn notify(&self, ctx: &BridgeContext, params: NotifyParams) -> Answer {
        let device_id = params.device_id.trim().to_owned();
        self.require_connected(&device_id)?;
        let service_id = parse_uuid(&params.service_id)?;
        let characteristic_id = parse_uuid(&params.characteristic_id)?;

        let services = self.backend.services(&device_id).await?;
        let service = services
            .iter()
            .find(|service| service.uuid == service_id)
            .ok_or_else(|| BleError::NoService(service_id.to_string()))?;
        let characteristic = service
            .characteristics
            .iter()
            .find(|characteristic| characteristic.uuid == characteristic_id)
            .ok_or_else(|| BleError::NoCharacteristic(characteristic_id.to_string()))?;

        let value = descriptor_value(characteristic.properties, params.enable)?;
        if !characteristic.descriptors.contains(&CCCD_UUID) {
            return Err(BleError::NoCharacteristic(format!(
                "{characteristic_id} descriptor {CCCD_UUID}"
            )));
        }
        if !self.backend.set_characteristic_notification(
            &device_id,
            service_id,
            characteristic_id,
            params.enable,
        ) {
            return Err(BleError::PropertyNotSupported(
                "the stack refused to switch notifications".into(),
            ));
        }
        self.backend
            .write_descriptor(&device_id, service_id, characteristic_id, CCCD_UUID, &value)
            .await?;

        {
            let mut notifying = lock(&self.notifying);
            if params.enable {
                notifying.insert((device_id.clone(), characteristic_id));
            } else {
                notifying.remove(&(device_id.clone(), characteristic_id));
            }
        }
        emit(
            ctx,
            events::NOTIFICATION_STATE_CHANGE,
            json!({
                "deviceId": device_id,
                "characteristicId": characteristic_id.to_string(),
                "isNotifying": params.enable,
            }),
        );
        Ok(Envelope::success(
            Some(json!({
                "characteristicId": characteristic_id.to_string(),
                "isNotifying": params.enable,
            })),
            if params.enable {
                "notifications enabled"
            } else {
                "notifications disabled"
            },
        ))
    }

    fn close_adapter(&self) -> Answer {
        self.backend.stop_scan();
        for device in self.backend.connected_devices() {
            self.backend.disconnect(&device.device_id);
        }
        lock(&self.scanned).clear();
        lock(&self.notifying).clear();
        self.backend.release();
        self.initialized.store(false, Ordering::SeqCst);
        // The pump ends by itself once the backend drops its event sender.
        lock(&self.pump).take();
        info!("bluetooth adapter closed");
        Ok(Envelope::success(None, "bluetooth adapter closed"))
    }

    async fn adapter_state(&self) -> Answer {
        let state = self.backend.adapter_state();
        if !state.supported {
            return Err(BleError::Unsupported);
        }
        if self.permissions.check(Permission::Bluetooth).await != PermissionStatus::Granted {
            return Err(BleError::System("bluetooth permission not granted".into()));
        }
        if !state.enabled {
            return Err(BleError::NotAvailable);
        }
        self.require_init()?;
        Ok(Envelope::success(
            Some(json!({ "available": true, "discovering": state.discovering })),
            "adapter state",
        ))
    }

    fn devices(&self) -> Answer {
        self.require_init()?;
        let scanned = lock(&self.scanned).clone();
        let mut list: Vec<Value> = scanned.iter().map(device_json).collect();
        for device in self.backend.connected_devices() {
            if !scanned.iter().any(|known| known.device_id == device.device_id) {
                list.push(device_json(&BleDevice { rssi: 0, ..device }));
            }
        }
        Ok(Envelope::success(Some(json!({ "devices": list })), "devices"))
    }
}

fn descriptor_value(
    properties: CharacteristicProperties,
    enable: bool,
) -> Result<[u8; 2], BleError> {
    if !enable {
        return Ok(DISABLE_NOTIFICATION_VALUE);
    }
    if properties.contains(CharacteristicProperties::NOTIFY) {
        Ok(ENABLE_NOTIFICATION_VALUE)
    } else if properties.contains(CharacteristicProperties::INDICATE) {
        Ok(ENABLE_INDICATION_VALUE)
    } else {
        Err(BleError::PropertyNotSupported(
            "characteristic supports neither notify nor indicate".into(),
        ))
    }
}

/// Parses a full UUID or a 16/32-bit short form.
fn parse_uuid(raw: &str) -> Result<Uuid, BleError> {
    let raw = raw.trim();
    if matches!(raw.len(), 4 | 8) {
        if let Ok(short) = u32::from_str_radix(raw, 16) {
            return Ok(Uuid::from_u128((u128::from(short) << 96) | BASE_UUID));
        }
    }
    Uuid::parse_str(raw).map_err(|err| BleError::InvalidData(format!("invalid uuid {raw:?}: {err}")))
}

fn device_json(device: &BleDevice) -> Value {
    json!({
        "name": device.name.clone().unwrap_or_default(),
        "RSSI": device.rssi,
        "deviceId": device.device_id,
    })
}

fn emit(ctx: &BridgeContext, event: &str, mut payload: Value) {
    if let Value::Object(map) = &mut payload {
        map.insert("eventName".to_owned(), Value::String(event.to_owned()));
    }
    ctx.emit(PLUGIN_NAME, payload);
}

fn parse<T: DeserializeOwned>(params: &str) -> Result<T, BleError> {
    parse_params(params).map_err(invalid)
}

fn invalid(err: BridgeError) -> BleError {
    match err {
        BridgeError::ParamParse(message) => BleError::InvalidData(message),
        other => BleError::InvalidData(other.to_string()),
    }
}

fn answer(reply: Reply, method: &str, result: Answer) {
    match result {
        Ok(envelope) => reply.success(envelope.to_value()),
        Err(err) => {
            warn!("{PLUGIN_NAME}.{method} failed: {err}");
            reply.fail(&err.into());
        }
    }
}

fn spawn_answer<F>(ctx: &BridgeContext, reply: Reply, method: String, task: F)
where
    F: Future<Output = Answer> + Send + 'static,
{
    ctx.spawn(async move { answer(reply, &method, task.await) });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
