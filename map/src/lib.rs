//! Navigation hand-off to third-party map apps.
//!
//! A [`Destination`] in GCJ-02 becomes a native deep link per [`MapApp`],
//! plus a web URL used when the app is not installed.

#![warn(missing_docs)]

mod encode;

pub use encode::encode_component;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Supported map apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapApp {
    /// Amap (Gaode).
    Amap,
    /// Baidu Maps.
    Baidu,
    /// Tencent Maps.
    Tencent,
}

impl MapApp {
    /// All apps, in the order the chooser lists them.
    pub const ALL: [Self; 3] = [Self::Amap, Self::Baidu, Self::Tencent];

    /// Android package name.
    #[must_use]
    pub const fn package(self) -> &'static str {
        match self {
            Self::Amap => "com.autonavi.minimap",
            Self::Baidu => "com.baidu.BaiduMap",
            Self::Tencent => "com.tencent.map",
        }
    }

    /// Name shown in the chooser.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Amap => "高德地图",
            Self::Baidu => "百度地图",
            Self::Tencent => "腾讯地图",
        }
    }

    /// Deep link and web fallback for `destination`.
    #[must_use]
    pub fn link(self, destination: &Destination) -> MapLink {
        let Destination {
            latitude: lat,
            longitude: lng,
            ..
        } = *destination;
        let name = encode_component(&destination.name);
        let (native_uri, web_url) = match self {
            Self::Amap => (
                format!(
                    "androidamap://navi?sourceApplication=app_name&poiname={name}&lat={lat}&lon={lng}&dev=0&style=2"
                ),
                format!("https://uri.amap.com/navigation?to={lng},{lat},{name}&mode=car"),
            ),
            Self::Baidu => (
                format!(
                    "baidumap://map/navi?location={lat},{lng}&title={name}&coord_type=gcj02&src=andr.jd.plugin"
                ),
                format!(
                    "http://api.map.baidu.com/direction?destination=latlng:{lat},{lng}|name:{name}&mode=driving&output=html&coord_type=gcj02"
                ),
            ),
            Self::Tencent => (
                format!("qqmap://map/marker?marker=coord:{lat},{lng};title={name}&referer=myapp"),
                format!("https://apis.map.qq.com/uri/v1/marker?marker=coord:{lat},{lng};title={name}"),
            ),
        };
        MapLink {
            app: self,
            native_uri,
            web_url,
        }
    }
}

/// Where to navigate to, in GCJ-02.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Destination {
    /// Latitude in degrees.
    #[serde(deserialize_with = "coordinate")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(deserialize_with = "coordinate")]
    pub longitude: f64,
    /// Display name of the place.
    #[serde(default)]
    pub name: String,
}

/// Accepts coordinates sent either as numbers or as numeric strings.
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().ok_or_else(|| D::Error::custom("coordinate out of range")),
        Value::String(s) if !s.trim().is_empty() => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid coordinate {s:?}"))),
        _ => Err(D::Error::custom("coordinate missing")),
    }
}

/// URIs for opening one destination in one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLink {
    /// Target app.
    pub app: MapApp,
    /// App scheme URI.
    pub native_uri: String,
    /// Browser fallback.
    pub web_url: String,
}

/// How a destination ended up being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Launched {
    /// App the user picked.
    pub app: MapApp,
    /// Whether the web fallback was used.
    pub web: bool,
}

/// Errors that can occur when opening a map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The user dismissed the chooser.
    #[error("map selection cancelled")]
    Cancelled,
    /// Neither the app nor the browser could be started.
    #[error("could not open map: {0}")]
    Launch(String),
}

/// Starts other apps on behalf of the page.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// Whether `package` is installed.
    fn is_installed(&self, package: &str) -> bool;

    /// Opens `uri`, restricted to `package` when given.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Launch`] if nothing handles the URI.
    fn open(&self, uri: &str, package: Option<&str>) -> Result<(), MapError>;

    /// Lets the user pick one of `options`; `None` when dismissed.
    async fn choose(&self, options: &[MapApp]) -> Option<MapApp>;
}

/// Opens destinations in map apps.
#[derive(Clone)]
pub struct MapLauncher {
    launcher: Arc<dyn AppLauncher>,
}

impl MapLauncher {
    /// Creates a launcher.
    #[must_use]
    pub fn new(launcher: Arc<dyn AppLauncher>) -> Self {
        Self { launcher }
    }

    /// Opens `destination` in `app`, or its web page if `app` is missing.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Launch`] if the URI cannot be opened.
    pub fn launch(&self, app: MapApp, destination: &Destination) -> Result<Launched, MapError> {
        let link = app.link(destination);
        if self.launcher.is_installed(app.package()) {
            debug!("opening {} natively", app.package());
            self.launcher.open(&link.native_uri, Some(app.package()))?;
            return Ok(Launched { app, web: false });
        }
        info!("{} is not installed, opening the web page", app.label());
        self.launcher.open(&link.web_url, None)?;
        Ok(Launched { app, web: true })
    }

    /// Shows the chooser and opens `destination` in the picked app.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Cancelled`] if the chooser is dismissed, or any
    /// error of [`MapLauncher::launch`].
    pub async fn choose_and_launch(&self, destination: &Destination) -> Result<Launched, MapError> {
        let app = self
            .launcher
            .choose(&MapApp::ALL)
            .await
            .ok_or(MapError::Cancelled)?;
        self.launch(app, destination)
    }
}

impl fmt::Debug for MapLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapLauncher").finish_non_exhaustive()
    }
}
