//! In-memory stand-ins for the platform side of every plugin.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use bridgekit::ble::{
    AdapterState, BleBackend, BleDevice, BleError, BleEvent, BleOptions, BlePlugin, CCCD_UUID,
    CharacteristicProperties, GattCharacteristic, GattService,
};
use bridgekit::bridge::{
    Bridge, BridgeContext, BridgeError, CallbackRegistry, EventEmitter, MainLoop, main_thread,
};
use bridgekit::fs::{DownloadConfig, DownloadError, Downloader, FileOpener};
use bridgekit::hybrid::{
    BasePlugin, BaseServices, HostBridgePlugin, HostDelegate, ScanResults, ScannerLauncher,
    WebViewHost,
};
use bridgekit::location::{Fix, LocationBackend, LocationManager, MemoryStore, Provider, now_millis};
use bridgekit::map::{AppLauncher, MapApp, MapError, MapLauncher};
use bridgekit::permission::{
    DENIED, Permission, PermissionBackend, PermissionBroker, PermissionError, PermissionStatus,
    result_id,
};
use bridgekit::system::{DeviceFacts, DeviceProbe, SystemError};
use bridgekit::{PluginSet, register_all_plugins};
use owo_colors::OwoColorize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// How the simulated platform behaves.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Answer permission prompts with a refusal.
    pub deny: bool,
    /// What the QR scanner reads; `None` backs out of the scanner.
    pub scan_text: Option<String>,
    /// Where downloads are saved.
    pub files_dir: Option<PathBuf>,
}

/// A bridge wired to simulated collaborators.
pub struct Host {
    pub bridge: Bridge,
    pub main_loop: MainLoop,
}

/// Builds a bridge with every plugin registered.
pub fn host(settings: &Settings) -> Result<Host> {
    let registry = Arc::new(CallbackRegistry::new());
    let (main, main_loop) = main_thread();
    let ctx = BridgeContext::new(registry.clone(), main, tokio::runtime::Handle::current())
        .with_emitter(Arc::new(Console));

    let permissions = PermissionBroker::new(
        registry.clone(),
        Arc::new(SimPermissions {
            deny: settings.deny,
            registry: registry.clone(),
        }),
    );
    let download = match &settings.files_dir {
        Some(dir) => DownloadConfig::with_files_dir(dir),
        None => DownloadConfig::default(),
    };
    let base = BaseServices {
        host: Arc::new(SimPage),
        scanner: Arc::new(SimScanner {
            registry,
            text: settings.scan_text.clone(),
        }),
        permissions: permissions.clone(),
        device: Arc::new(SimDevice),
        location: LocationManager::new(
            Arc::new(SimLocation::default()),
            permissions.clone(),
            Arc::new(MemoryStore::new()),
        ),
        maps: MapLauncher::new(Arc::new(SimMaps)),
        downloader: Downloader::new(download)?,
        opener: Arc::new(SimOpener),
    };
    let host_plugin = Arc::new(HostBridgePlugin::new());
    host_plugin.set_delegate(Some(Arc::new(SimDelegate)));

    let mut bridge = Bridge::new(ctx);
    register_all_plugins(
        &mut bridge,
        PluginSet {
            base: Some(BasePlugin::new(base)),
            host: Some(host_plugin),
            ble: Some(BlePlugin::new(
                Arc::new(SimBle::default()),
                permissions,
                BleOptions::default(),
            )),
            extra: Vec::new(),
        },
    );
    Ok(Host { bridge, main_loop })
}

/// Prints events pushed to web content.
struct Console;

impl EventEmitter for Console {
    fn emit(&self, plugin: &str, payload: Value) {
        println!("{} {plugin} {payload}", "⚡".cyan());
    }
}

struct SimPermissions {
    deny: bool,
    registry: Arc<CallbackRegistry>,
}

#[async_trait]
impl PermissionBackend for SimPermissions {
    async fn check(&self, _: Permission) -> PermissionStatus {
        if self.deny {
            PermissionStatus::NotDetermined
        } else {
            PermissionStatus::Granted
        }
    }

    fn prompt(&self, permissions: &[Permission], request_code: i32) -> Result<(), PermissionError> {
        let names: Vec<&str> = permissions
            .iter()
            .flat_map(|p| p.platform_names().iter().copied())
            .collect();
        println!("{} refusing {}", "🔒".yellow(), names.join(", "));
        self.registry.invoke(
            &result_id(request_code),
            json!({
                "requestCode": request_code,
                "grantResults": vec![DENIED; names.len()],
                "permissions": names,
            }),
        );
        Ok(())
    }
}

struct SimPage;

#[async_trait]
impl WebViewHost for SimPage {
    fn can_go_back(&self) -> bool {
        false
    }

    fn go_back(&self) {}

    async fn confirm_exit(&self) -> bool {
        true
    }

    fn finish(&self) {
        println!("{} page closed", "🚪".yellow());
    }
}

struct SimScanner {
    registry: Arc<CallbackRegistry>,
    text: Option<String>,
}

impl ScannerLauncher for SimScanner {
    fn launch(&self, callback_id: &str) -> Result<(), BridgeError> {
        let results = ScanResults::with_callback_id(self.registry.clone(), callback_id);
        match &self.text {
            Some(text) => {
                results.deliver(text);
            }
            None => results.cancel(),
        }
        Ok(())
    }
}

struct SimDevice;

impl DeviceProbe for SimDevice {
    fn facts(&self) -> Result<DeviceFacts, SystemError> {
        Ok(DeviceFacts {
            model: "Simulator".into(),
            brand: "bridgekit".into(),
            manufacturer: "bridgekit".into(),
            release: "14".into(),
            sdk_int: 34,
            app_version_name: Some(env!("CARGO_PKG_VERSION").into()),
            app_version_code: Some(1),
            screen_width_px: 1080,
            screen_height_px: 2340,
            density: 2.75,
            status_bar_px: 110,
            nav_bar_px: 132,
            nav_bar_shown: true,
            top_inset_px: Some(110),
            bottom_inset_px: Some(132),
            bottom_cutout_px: 0,
            locale: "zh_CN".into(),
            timezone: "Asia/Shanghai".into(),
        })
    }
}

/// GPS reports a single fix near Tiananmen as soon as it is asked.
#[derive(Default)]
struct SimLocation {
    sinks: Mutex<Vec<Sender<Fix>>>,
}

impl LocationBackend for SimLocation {
    fn is_provider_enabled(&self, provider: Provider) -> bool {
        provider == Provider::Gps
    }

    fn last_known(&self, _: Provider) -> Option<Fix> {
        None
    }

    fn start_updates(&self, provider: Provider, sink: Sender<Fix>) {
        if provider == Provider::Gps {
            let fix = Fix {
                latitude: 39.907_5,
                longitude: 116.391_2,
                accuracy: 12.0,
                provider,
                timestamp: now_millis(),
            };
            if sink.try_send(fix).is_err() {
                return;
            }
        }
        lock(&self.sinks).push(sink);
    }

    fn stop_updates(&self) {
        lock(&self.sinks).clear();
    }
}

/// Only Amap is installed; the chooser always picks the first entry.
struct SimMaps;

#[async_trait]
impl AppLauncher for SimMaps {
    fn is_installed(&self, package: &str) -> bool {
        package == MapApp::Amap.package()
    }

    fn open(&self, uri: &str, package: Option<&str>) -> Result<(), MapError> {
        println!(
            "{} {uri} ({})",
            "🗺".green(),
            package.unwrap_or("browser")
        );
        Ok(())
    }

    async fn choose(&self, options: &[MapApp]) -> Option<MapApp> {
        options.first().copied()
    }
}

struct SimOpener;

impl FileOpener for SimOpener {
    fn open(&self, path: &Path, mime: &str) -> Result<(), DownloadError> {
        println!("{} {} as {mime}", "📄".green(), path.display());
        Ok(())
    }
}

struct SimDelegate;

#[async_trait]
impl HostDelegate for SimDelegate {
    async fn open_page(&self, url: &str, params: Option<Map<String, Value>>) -> Option<Value> {
        println!(
            "{} open {url} {}",
            "📱".green(),
            params.map(Value::Object).unwrap_or_default()
        );
        None
    }

    async fn custom_method(&self, method: &str, params: Map<String, Value>) -> Option<Value> {
        Some(json!({ "method": method, "params": params }))
    }
}

const DEVICE_ID: &str = "C4:7F:51:00:00:01";
const SERVICE: Uuid = Uuid::from_u128(0x0000_ff00_0000_1000_8000_0080_5f9b_34fb);
const WRITE_CHAR: Uuid = Uuid::from_u128(0x0000_ff01_0000_1000_8000_0080_5f9b_34fb);
const NOTIFY_CHAR: Uuid = Uuid::from_u128(0x0000_ff02_0000_1000_8000_0080_5f9b_34fb);

/// One peripheral that echoes every write back on its notify characteristic.
#[derive(Default)]
struct SimBle {
    events: Mutex<Option<Sender<BleEvent>>>,
    connected: Mutex<bool>,
    notifying: Mutex<bool>,
}

impl SimBle {
    fn send(&self, event: BleEvent) {
        if let Some(events) = lock(&self.events).as_ref() {
            let _ = events.try_send(event);
        }
    }

    fn peripheral() -> BleDevice {
        BleDevice {
            device_id: DEVICE_ID.to_owned(),
            name: Some("QX-Lock".to_owned()),
            rssi: -58,
        }
    }
}

#[async_trait]
impl BleBackend for SimBle {
    fn adapter_state(&self) -> AdapterState {
        AdapterState {
            supported: true,
            enabled: true,
            discovering: false,
        }
    }

    async fn init(&self, _: &BleOptions, events: Sender<BleEvent>) -> Result<(), BleError> {
        *lock(&self.events) = Some(events);
        Ok(())
    }

    fn start_scan(&self, _: &BleOptions) -> Result<(), BleError> {
        self.send(BleEvent::DeviceFound(Self::peripheral()));
        self.send(BleEvent::ScanStopped);
        Ok(())
    }

    fn stop_scan(&self) {}

    async fn connect(&self, device_id: &str, _: &BleOptions) -> Result<Option<String>, BleError> {
        if device_id != DEVICE_ID {
            return Err(BleError::ConnectFailed(133));
        }
        *lock(&self.connected) = true;
        self.send(BleEvent::ConnectionChanged {
            device_id: DEVICE_ID.to_owned(),
            name: Self::peripheral().name,
            connected: true,
        });
        Ok(Self::peripheral().name)
    }

    fn disconnect(&self, _: &str) {
        *lock(&self.connected) = false;
        *lock(&self.notifying) = false;
    }

    fn connected_devices(&self) -> Vec<BleDevice> {
        if *lock(&self.connected) {
            vec![Self::peripheral()]
        } else {
            Vec::new()
        }
    }

    async fn services(&self, device_id: &str) -> Result<Vec<GattService>, BleError> {
        if !*lock(&self.connected) {
            return Err(BleError::NotConnected(device_id.to_owned()));
        }
        Ok(vec![GattService {
            uuid: SERVICE,
            is_primary: true,
            characteristics: vec![
                GattCharacteristic {
                    uuid: WRITE_CHAR,
                    properties: CharacteristicProperties::WRITE
                        | CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
                    descriptors: Vec::new(),
                },
                GattCharacteristic {
                    uuid: NOTIFY_CHAR,
                    properties: CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
                    descriptors: vec![CCCD_UUID],
                },
            ],
        }])
    }

    async fn write_characteristic(
        &self,
        device_id: &str,
        _: Uuid,
        _: Uuid,
        data: &[u8],
    ) -> Result<Vec<u8>, BleError> {
        if *lock(&self.notifying) {
            self.send(BleEvent::ValueChanged {
                device_id: device_id.to_owned(),
                characteristic: NOTIFY_CHAR,
                value: data.to_vec(),
            });
        }
        Ok(data.to_vec())
    }

    fn set_characteristic_notification(&self, _: &str, _: Uuid, _: Uuid, enable: bool) -> bool {
        *lock(&self.notifying) = enable;
        true
    }

    async fn write_descriptor(
        &self,
        _: &str,
        _: Uuid,
        _: Uuid,
        _: Uuid,
        _: &[u8],
    ) -> Result<(), BleError> {
        Ok(())
    }

    fn release(&self) {
        lock(&self.events).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
