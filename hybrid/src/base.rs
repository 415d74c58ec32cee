use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bridgekit_bridge::{BridgeContext, BridgeError, Plugin, Reply, SharedCallback, parse_params};
use bridgekit_fs::{DownloadError, DownloadRequest, Downloader, FileOpener, mime_type_for};
use bridgekit_location::{LocationManager, LocationRequest};
use bridgekit_map::{Destination, MapLauncher};
use bridgekit_permission::{Permission, PermissionBroker};
use bridgekit_system::{DeviceInfo, DeviceProbe, SafeArea};
use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::scan::SCAN_CALLBACK_ID;
use crate::{ScannerLauncher, WebViewHost};

/// Name web content addresses the plugin by.
pub const BASE_PLUGIN_NAME: &str = "QXBasePlugin";

const METHODS: [&str; 8] = [
    "scanQRCode",
    "goBack",
    "closeWebView",
    "getDeviceInfo",
    "getSystemInfo",
    "location",
    "downloadAndOpenFile",
    "openMap",
];

/// Collaborators [`BasePlugin`] works through.
pub struct BaseServices {
    /// The page hosting the WebView.
    pub host: Arc<dyn WebViewHost>,
    /// Starts the QR scanner.
    pub scanner: Arc<dyn ScannerLauncher>,
    /// Runtime permissions.
    pub permissions: PermissionBroker,
    /// Device and screen facts.
    pub device: Arc<dyn DeviceProbe>,
    /// One-shot location searches.
    pub location: LocationManager,
    /// Map app hand-off.
    pub maps: MapLauncher,
    /// File downloads.
    pub downloader: Downloader,
    /// Shows downloaded files.
    pub opener: Arc<dyn FileOpener>,
}

impl fmt::Debug for BaseServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseServices")
            .field("maps", &self.maps)
            .field("downloader", &self.downloader)
            .finish_non_exhaustive()
    }
}

/// The `QXBasePlugin` bridge plugin.
pub struct BasePlugin {
    services: Arc<BaseServices>,
}

impl BasePlugin {
    /// Creates the plugin.
    #[must_use]
    pub fn new(services: BaseServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

impl Plugin for BasePlugin {
    fn name(&self) -> &str {
        BASE_PLUGIN_NAME
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
        let reply = ctx.reply(callback);
        let services = self.services.clone();
        match method {
            "scanQRCode" => scan_qr_code(ctx, services, reply),
            "goBack" => go_back(ctx, services, reply),
            "closeWebView" => {
                services.host.finish();
                reply.success(Value::Null);
            }
            "getDeviceInfo" => reply.resolve(
                services
                    .device
                    .facts()
                    .map_err(|err| BridgeError::System(err.to_string()))
                    .and_then(|facts| Ok(serde_json::to_value(DeviceInfo::from_facts(&facts))?)),
            ),
            "getSystemInfo" => reply.resolve(
                services
                    .device
                    .facts()
                    .map_err(|err| BridgeError::System(err.to_string()))
                    .and_then(|facts| Ok(serde_json::to_value(SafeArea::from_facts(&facts))?)),
            ),
            "location" => match parse_params::<LocationRequest>(params) {
                Ok(request) => {
                    ctx.spawn(async move {
                        match services.location.locate(request).await {
                            Ok(report) => {
                                reply.resolve(serde_json::to_value(report).map_err(Into::into));
                            }
                            Err(err) => {
                                warn!("location failed: {err}");
                                reply.error(err.to_json().to_string());
                            }
                        }
                    });
                }
                Err(err) => reply.error(err.to_string()),
            },
            "downloadAndOpenFile" => match parse_params::<DownloadRequest>(params) {
                Ok(request) => {
                    ctx.spawn(download_and_open(services, request, reply));
                }
                Err(err) => reply.fail(&err),
            },
            "openMap" => match parse_params::<Destination>(params) {
                Ok(destination) => {
                    ctx.spawn(async move {
                        match services.maps.choose_and_launch(&destination).await {
                            Ok(launched) => {
                                reply.resolve(serde_json::to_value(launched).map_err(Into::into));
                            }
                            Err(err) => {
                                info!("openMap: {err}");
                                reply.error(err.to_string());
                            }
                        }
                    });
                }
                Err(err) => reply.error(err.to_string()),
            },
            _ => return false,
        }
        debug!("{BASE_PLUGIN_NAME}.{method}");
        true
    }
}

impl fmt::Debug for BasePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasePlugin").finish_non_exhaustive()
    }
}

fn scan_qr_code(ctx: &BridgeContext, services: Arc<BaseServices>, reply: Reply) {
    let registry = ctx.registry().clone();
    ctx.spawn(async move {
        if let Err(err) = services.permissions.ensure(Permission::Camera).await {
            warn!("camera permission: {err}");
            reply.error(format!("camera {err}"));
            return;
        }
        let id = reply.park(&registry, SCAN_CALLBACK_ID);
        if let Err(err) = services.scanner.launch(&id) {
            warn!("scanner did not start: {err}");
            registry.invoke_error(&id, err.to_string());
        }
    });
}

fn go_back(ctx: &BridgeContext, services: Arc<BaseServices>, reply: Reply) {
    if services.host.can_go_back() {
        services.host.go_back();
        reply.success(json!(true));
        return;
    }
    let main = ctx.main().clone();
    ctx.spawn(async move {
        if services.host.confirm_exit().await {
            main.post(move || services.host.finish());
            reply.success(json!(false));
        } else {
            reply.error("exit cancelled");
        }
    });
}

async fn download_and_open(services: Arc<BaseServices>, request: DownloadRequest, reply: Reply) {
    let path = match services.downloader.download(&request.url).await {
        Ok(path) => path,
        Err(err) => {
            warn!("download of {} failed: {err}", request.url);
            reply.fail(&download_error(&err));
            return;
        }
    };
    reply.envelope_success(
        Some(json!({ "filePath": path.display().to_string() })),
        "download complete",
    );
    if request.is_open {
        open_file(services.opener.as_ref(), &path);
    }
}

fn open_file(opener: &dyn FileOpener, path: &Path) {
    let mime = mime_type_for(path);
    if let Err(err) = opener.open(path, mime) {
        warn!("could not open {}: {err}", path.display());
    }
}

fn download_error(err: &DownloadError) -> BridgeError {
    match err {
        DownloadError::InvalidUrl(_) => BridgeError::ParamParse(err.to_string()),
        _ => BridgeError::System(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_urls_are_param_errors() {
        let err = download_error(&DownloadError::InvalidUrl("ftp://x".into()));
        assert_eq!(err.to_envelope().code, 10013);
        let err = download_error(&DownloadError::Status(404));
        assert_eq!(err.to_envelope().code, 10008);
        assert_eq!(err.to_string(), "system error: server responded with status 404");
    }
}
