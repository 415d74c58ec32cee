use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use bridgekit_bridge::{
    Bridge, BridgeContext, BridgeError, CallbackRegistry, ChannelCallback, MainLoop, Outcome,
    main_thread,
};
use bridgekit_fs::{DownloadConfig, DownloadError, Downloader, FileOpener};
use bridgekit_hybrid::{
    BASE_PLUGIN_NAME, BasePlugin, BaseServices, SCAN_CALLBACK_ID, ScanResults, ScannerLauncher,
    WebViewHost,
};
use bridgekit_location::{Fix, LocationBackend, LocationManager, MemoryStore, Provider};
use bridgekit_map::{AppLauncher, MapApp, MapError, MapLauncher};
use bridgekit_permission::{
    DENIED, Permission, PermissionBackend, PermissionBroker, PermissionError, PermissionStatus,
    result_id,
};
use bridgekit_system::{DeviceFacts, DeviceProbe, SystemError};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeHost {
    history: bool,
    confirm: bool,
    back: AtomicUsize,
    finished: AtomicUsize,
}

#[async_trait]
impl WebViewHost for FakeHost {
    fn can_go_back(&self) -> bool {
        self.history
    }

    fn go_back(&self) {
        self.back.fetch_add(1, Ordering::SeqCst);
    }

    async fn confirm_exit(&self) -> bool {
        self.confirm
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plays the scanner screen: answers with `text` as soon as it is launched.
struct FakeScanner {
    registry: Arc<CallbackRegistry>,
    text: Option<&'static str>,
    broken: bool,
    launched: Mutex<Vec<String>>,
}

impl ScannerLauncher for FakeScanner {
    fn launch(&self, callback_id: &str) -> Result<(), BridgeError> {
        if self.broken {
            return Err(BridgeError::System("no camera".into()));
        }
        self.launched.lock().unwrap().push(callback_id.to_owned());
        let results = ScanResults::with_callback_id(self.registry.clone(), callback_id);
        match self.text {
            Some(text) => {
                results.deliver(text);
            }
            None => results.cancel(),
        }
        Ok(())
    }
}

struct FakePermissions {
    granted: bool,
    registry: Arc<CallbackRegistry>,
}

#[async_trait]
impl PermissionBackend for FakePermissions {
    async fn check(&self, _: Permission) -> PermissionStatus {
        if self.granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::NotDetermined
        }
    }

    fn prompt(&self, _: &[Permission], request_code: i32) -> Result<(), PermissionError> {
        self.registry.invoke(
            &result_id(request_code),
            json!({
                "requestCode": request_code,
                "permissions": ["android.permission.CAMERA"],
                "grantResults": [DENIED],
            }),
        );
        Ok(())
    }
}

struct FakeDevice;

impl DeviceProbe for FakeDevice {
    fn facts(&self) -> Result<DeviceFacts, SystemError> {
        Ok(DeviceFacts {
            model: "Pixel 8".into(),
            brand: "google".into(),
            manufacturer: "Google".into(),
            release: "14".into(),
            sdk_int: 34,
            screen_width_px: 1080,
            screen_height_px: 2400,
            density: 2.0,
            status_bar_px: 96,
            nav_bar_px: 48,
            nav_bar_shown: true,
            locale: "zh_CN".into(),
            timezone: "Asia/Shanghai".into(),
            ..DeviceFacts::default()
        })
    }
}

/// Every provider is switched off.
struct NoLocation;

impl LocationBackend for NoLocation {
    fn is_provider_enabled(&self, _: Provider) -> bool {
        false
    }

    fn last_known(&self, _: Provider) -> Option<Fix> {
        None
    }

    fn start_updates(&self, _: Provider, _: Sender<Fix>) {}

    fn stop_updates(&self) {}
}

struct FakeMaps {
    pick: Option<MapApp>,
    opened: Mutex<Vec<String>>,
}

#[async_trait]
impl AppLauncher for FakeMaps {
    fn is_installed(&self, _: &str) -> bool {
        false
    }

    fn open(&self, uri: &str, _: Option<&str>) -> Result<(), MapError> {
        self.opened.lock().unwrap().push(uri.to_owned());
        Ok(())
    }

    async fn choose(&self, _: &[MapApp]) -> Option<MapApp> {
        self.pick
    }
}

#[derive(Default)]
struct FakeOpener(Mutex<Vec<(PathBuf, String)>>);

impl FileOpener for FakeOpener {
    fn open(&self, path: &Path, mime: &str) -> Result<(), DownloadError> {
        self.0
            .lock()
            .unwrap()
            .push((path.to_path_buf(), mime.to_owned()));
        Ok(())
    }
}

struct Setup {
    history: bool,
    confirm: bool,
    granted: bool,
    scan_text: Option<&'static str>,
    broken_scanner: bool,
    map_pick: Option<MapApp>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            history: false,
            confirm: true,
            granted: true,
            scan_text: Some("https://example.com/ticket/42"),
            broken_scanner: false,
            map_pick: Some(MapApp::Amap),
        }
    }
}

struct Harness {
    bridge: Bridge,
    main_loop: MainLoop,
    registry: Arc<CallbackRegistry>,
    host: Arc<FakeHost>,
    scanner: Arc<FakeScanner>,
    maps: Arc<FakeMaps>,
    opener: Arc<FakeOpener>,
    _files: tempfile::TempDir,
}

fn harness(setup: Setup) -> Harness {
    let registry = Arc::new(CallbackRegistry::new());
    let (main, main_loop) = main_thread();
    let ctx = BridgeContext::new(registry.clone(), main, tokio::runtime::Handle::current());

    let permissions = PermissionBroker::new(
        registry.clone(),
        Arc::new(FakePermissions {
            granted: setup.granted,
            registry: registry.clone(),
        }),
    );
    let host = Arc::new(FakeHost {
        history: setup.history,
        confirm: setup.confirm,
        ..FakeHost::default()
    });
    let scanner = Arc::new(FakeScanner {
        registry: registry.clone(),
        text: setup.scan_text,
        broken: setup.broken_scanner,
        launched: Mutex::new(Vec::new()),
    });
    let maps = Arc::new(FakeMaps {
        pick: setup.map_pick,
        opened: Mutex::new(Vec::new()),
    });
    let opener = Arc::new(FakeOpener::default());
    let files = tempfile::tempdir().unwrap();

    let services = BaseServices {
        host: host.clone(),
        scanner: scanner.clone(),
        permissions: permissions.clone(),
        device: Arc::new(FakeDevice),
        location: LocationManager::new(
            Arc::new(NoLocation),
            permissions,
            Arc::new(MemoryStore::new()),
        ),
        maps: MapLauncher::new(maps.clone()),
        downloader: Downloader::new(DownloadConfig::with_files_dir(files.path())).unwrap(),
        opener: opener.clone(),
    };
    let mut bridge = Bridge::new(ctx);
    bridge.register(Arc::new(BasePlugin::new(services)));
    Harness {
        bridge,
        main_loop,
        registry,
        host,
        scanner,
        maps,
        opener,
        _files: files,
    }
}

impl Harness {
    fn dispatch(&self, method: &str, params: Value) -> Receiver<Outcome> {
        let (callback, results) = ChannelCallback::pair();
        assert!(
            self.bridge
                .dispatch(BASE_PLUGIN_NAME, method, &params.to_string(), callback)
        );
        results
    }

    async fn outcome(&self, results: &Receiver<Outcome>) -> Outcome {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(outcome) = results.try_recv() {
                    return outcome;
                }
                assert!(self.main_loop.tick().await);
            }
        })
        .await
        .expect("no reply")
    }

    async fn call(&self, method: &str, params: Value) -> Outcome {
        let results = self.dispatch(method, params);
        self.outcome(&results).await
    }
}

/// Serves one canned HTTP response and returns the base URL.
async fn serve_once(body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0_u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn unknown_methods_fall_through() {
    let h = harness(Setup::default());
    let (callback, results) = ChannelCallback::pair();
    assert!(!h.bridge.dispatch(BASE_PLUGIN_NAME, "shareToWechat", "{}", callback));
    h.main_loop.run_pending();
    assert!(results.try_recv().is_err());
}

#[tokio::test]
async fn scanned_text_comes_back_to_the_caller() {
    let h = harness(Setup::default());
    let outcome = h.call("scanQRCode", json!({})).await;
    assert_eq!(
        outcome,
        Outcome::Success(json!({"data": "https://example.com/ticket/42", "success": true}))
    );
    assert_eq!(*h.scanner.launched.lock().unwrap(), [SCAN_CALLBACK_ID]);
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn empty_scan_is_an_error() {
    let h = harness(Setup {
        scan_text: Some(""),
        ..Setup::default()
    });
    let outcome = h.call("scanQRCode", json!({})).await;
    assert_eq!(outcome.error(), Some("scan result is empty"));
}

#[tokio::test]
async fn cancelled_scan_never_answers() {
    let h = harness(Setup {
        scan_text: None,
        ..Setup::default()
    });
    let results = h.dispatch("scanQRCode", json!({}));
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.scanner.launched.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    h.main_loop.run_pending();
    assert!(results.try_recv().is_err());
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn scan_needs_the_camera() {
    let h = harness(Setup {
        granted: false,
        ..Setup::default()
    });
    let outcome = h.call("scanQRCode", json!({})).await;
    assert_eq!(outcome.error(), Some("camera permission denied"));
    assert!(h.scanner.launched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scanner_that_cannot_start_fails_the_call() {
    let h = harness(Setup {
        broken_scanner: true,
        ..Setup::default()
    });
    let outcome = h.call("scanQRCode", json!({})).await;
    assert_eq!(outcome.error(), Some("system error: no camera"));
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn go_back_walks_web_history_first() {
    let h = harness(Setup {
        history: true,
        ..Setup::default()
    });
    assert_eq!(h.call("goBack", json!({})).await, Outcome::Success(json!(true)));
    assert_eq!(h.host.back.load(Ordering::SeqCst), 1);
    assert_eq!(h.host.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn go_back_without_history_asks_before_leaving() {
    let h = harness(Setup::default());
    assert_eq!(h.call("goBack", json!({})).await, Outcome::Success(json!(false)));
    assert_eq!(h.host.finished.load(Ordering::SeqCst), 1);

    let h = harness(Setup {
        confirm: false,
        ..Setup::default()
    });
    assert_eq!(h.call("goBack", json!({})).await.error(), Some("exit cancelled"));
    assert_eq!(h.host.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn close_web_view_finishes_the_page() {
    let h = harness(Setup::default());
    assert_eq!(h.call("closeWebView", json!({})).await, Outcome::Success(Value::Null));
    assert_eq!(h.host.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn device_and_system_info_are_in_dp() {
    let h = harness(Setup::default());
    let Outcome::Success(info) = h.call("getDeviceInfo", json!({})).await else {
        panic!("getDeviceInfo failed");
    };
    assert_eq!(info["appPlatform"], "android");
    assert_eq!(info["screenWidth"], 540.0);
    assert_eq!(info["navBarHeight"], 24.0);
    assert_eq!(info["appVersion"], "1.0.0");

    let Outcome::Success(safe) = h.call("getSystemInfo", json!({})).await else {
        panic!("getSystemInfo failed");
    };
    assert_eq!(safe["osName"], "Android");
    assert_eq!(safe["statusBarHeight"], 48.0);
    assert_eq!(safe["bottomSafeHeightPx"], 48);
}

#[tokio::test]
async fn location_errors_carry_their_code() {
    let h = harness(Setup::default());
    let outcome = h.call("location", json!({"timeout": 1000})).await;
    let error: Value = serde_json::from_str(outcome.error().unwrap()).unwrap();
    assert_eq!(error["code"], 1007);
}

#[tokio::test]
async fn downloads_reply_with_the_path_then_open() {
    let h = harness(Setup::default());
    let base = serve_once(b"%PDF-1.7 hello").await;
    let outcome = h
        .call("downloadAndOpenFile", json!({"url": format!("{base}/docs/manual.pdf")}))
        .await;
    let Outcome::Success(envelope) = outcome else {
        panic!("download failed: {outcome:?}");
    };
    assert_eq!(envelope["code"], 0);
    let path = PathBuf::from(envelope["data"]["filePath"].as_str().unwrap());
    assert_eq!(path.file_name().unwrap(), "manual.pdf");

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.opener.0.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(
        *h.opener.0.lock().unwrap(),
        [(path, "application/pdf".to_owned())]
    );
}

#[tokio::test]
async fn bad_download_urls_fail_with_an_envelope() {
    let h = harness(Setup::default());
    let outcome = h
        .call("downloadAndOpenFile", json!({"url": "ftp://example.com/a.pdf", "isOpen": false}))
        .await;
    let envelope: Value = serde_json::from_str(outcome.error().unwrap()).unwrap();
    assert_eq!(envelope["code"], 10013);
    assert!(h.opener.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn open_map_falls_back_to_the_web() {
    let h = harness(Setup::default());
    let outcome = h
        .call(
            "openMap",
            json!({"latitude": "39.908", "longitude": 116.397, "name": "天安门"}),
        )
        .await;
    assert_eq!(outcome, Outcome::Success(json!({"app": "amap", "web": true})));
    let opened = h.maps.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].starts_with("https://uri.amap.com/navigation?to=116.397,39.908,"));
}

#[tokio::test]
async fn dismissed_map_chooser_is_an_error() {
    let h = harness(Setup {
        map_pick: None,
        ..Setup::default()
    });
    let outcome = h
        .call("openMap", json!({"latitude": 39.9, "longitude": 116.4}))
        .await;
    assert_eq!(outcome.error(), Some("map selection cancelled"));

    let outcome = h.call("openMap", json!({"latitude": "", "longitude": 116.4})).await;
    assert!(outcome.error().unwrap().starts_with("invalid params"));
}
