//! Device and app facts reported to web content.
//!
//! The host supplies raw platform facts through a [`DeviceProbe`]; this crate
//! turns them into the [`DeviceInfo`] and [`SafeArea`] reports pages expect,
//! with sizes in density-independent pixels.

#![warn(missing_docs)]

mod metrics;

pub use metrics::{dp_to_px, px_to_dp, round_one_decimal};

use log::debug;
use serde::Serialize;
use thiserror::Error;

/// App version reported when the package manager has none.
pub const FALLBACK_VERSION_NAME: &str = "1.0.0";
/// Build number reported when the package manager has none.
pub const FALLBACK_VERSION_CODE: i64 = 100;

/// Raw facts read from the platform, sizes in physical pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceFacts {
    /// Device model, e.g. `Pixel 8`.
    pub model: String,
    /// Device brand.
    pub brand: String,
    /// Device manufacturer.
    pub manufacturer: String,
    /// OS release, e.g. `14`.
    pub release: String,
    /// OS API level.
    pub sdk_int: u32,
    /// App version name, if known.
    pub app_version_name: Option<String>,
    /// App build number, if known.
    pub app_version_code: Option<i64>,
    /// Real screen width.
    pub screen_width_px: u32,
    /// Real screen height.
    pub screen_height_px: u32,
    /// Display density (px per dp).
    pub density: f64,
    /// Status bar height.
    pub status_bar_px: u32,
    /// Navigation bar height.
    pub nav_bar_px: u32,
    /// Whether a navigation bar is on screen.
    pub nav_bar_shown: bool,
    /// Top system-bar inset of the host window, when attached.
    pub top_inset_px: Option<u32>,
    /// Bottom system-bar inset of the host window, when attached.
    pub bottom_inset_px: Option<u32>,
    /// Bottom display cutout inset.
    pub bottom_cutout_px: u32,
    /// Locale tag, e.g. `zh_CN`.
    pub locale: String,
    /// Time zone id, e.g. `Asia/Shanghai`.
    pub timezone: String,
}

/// Errors that can occur when reading device facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    /// The host page or app context is gone.
    #[error("device facts unavailable: {0}")]
    Unavailable(String),
}

/// Source of [`DeviceFacts`].
pub trait DeviceProbe: Send + Sync {
    /// Reads the current facts.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::Unavailable`] when there is no context to read from.
    fn facts(&self) -> Result<DeviceFacts, SystemError>;
}

/// The `getDeviceInfo` report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Device model.
    pub model: String,
    /// Device brand.
    pub brand: String,
    /// OS release.
    pub system_version: String,
    /// OS API level.
    #[serde(rename = "systemSDK")]
    pub system_sdk: u32,
    /// Manufacturer.
    pub device_model: String,
    /// Always `android`.
    pub app_platform: &'static str,
    /// OS release, again under the name older pages read.
    #[serde(rename = "OSVersion")]
    pub os_version: String,
    /// App version name.
    pub app_version: String,
    /// App build number.
    pub build_version: i64,
    /// Screen width in dp.
    pub screen_width: f64,
    /// Screen height in dp.
    pub screen_height: f64,
    /// Status bar height in dp.
    pub status_bar_height: f64,
    /// Navigation bar height in dp, `0` when hidden.
    pub nav_bar_height: f64,
    /// Bottom cutout inset in dp.
    pub bottom_safe_height: f64,
    /// Locale tag.
    pub locale: String,
    /// Time zone id.
    pub timezone: String,
}

impl DeviceInfo {
    /// Builds the report from raw facts.
    #[must_use]
    pub fn from_facts(facts: &DeviceFacts) -> Self {
        let dp = |px: u32| px_to_dp(f64::from(px), facts.density);
        let nav_bar_px = if facts.nav_bar_shown { facts.nav_bar_px } else { 0 };
        Self {
            model: facts.model.clone(),
            brand: facts.brand.clone(),
            system_version: facts.release.clone(),
            system_sdk: facts.sdk_int,
            device_model: facts.manufacturer.clone(),
            app_platform: "android",
            os_version: facts.release.clone(),
            app_version: facts
                .app_version_name
                .clone()
                .unwrap_or_else(|| FALLBACK_VERSION_NAME.to_owned()),
            build_version: facts.app_version_code.unwrap_or(FALLBACK_VERSION_CODE),
            screen_width: dp(facts.screen_width_px),
            screen_height: dp(facts.screen_height_px),
            status_bar_height: dp(facts.status_bar_px),
            nav_bar_height: dp(nav_bar_px),
            bottom_safe_height: dp(facts.bottom_cutout_px),
            locale: facts.locale.clone(),
            timezone: facts.timezone.clone(),
        }
    }
}

/// The `getSystemInfo` safe-area report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeArea {
    /// OS release.
    pub system_version: String,
    /// Always `Android`.
    pub os_name: &'static str,
    /// Device model.
    pub device_model: String,
    /// Top inset in dp, one decimal.
    pub status_bar_height: f64,
    /// Bottom inset in dp, one decimal.
    pub bottom_safe_height: f64,
    /// Top inset in px.
    pub status_bar_height_px: u32,
    /// Bottom inset in px.
    pub bottom_safe_height_px: u32,
}

impl SafeArea {
    /// Builds the report from raw facts.
    ///
    /// The top inset falls back to the status bar height. The bottom inset
    /// falls back to the navigation bar height when one is shown.
    #[must_use]
    pub fn from_facts(facts: &DeviceFacts) -> Self {
        let top_px = facts
            .top_inset_px
            .filter(|px| *px > 0)
            .unwrap_or(facts.status_bar_px);
        let bottom_px = match facts.bottom_inset_px.filter(|px| *px > 0) {
            Some(px) => px,
            None if facts.nav_bar_shown => facts.nav_bar_px,
            None => 0,
        };
        let dp = |px: u32| round_one_decimal(px_to_dp(f64::from(px), facts.density));
        debug!("safe area top={top_px}px bottom={bottom_px}px");
        Self {
            system_version: facts.release.clone(),
            os_name: "Android",
            device_model: facts.model.clone(),
            status_bar_height: dp(top_px),
            bottom_safe_height: dp(bottom_px),
            status_bar_height_px: top_px,
            bottom_safe_height_px: bottom_px,
        }
    }
}
