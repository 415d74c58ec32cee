use std::fmt;
use std::sync::Mutex;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::fix::{Fix, MAX_FIX_AGE_MS};
use crate::gcj02::wgs84_to_gcj02;

/// Key the last delivered report is stored under.
pub const CACHE_KEY: &str = "SCCLocationPositioningCache";
/// A cached report is reused on timeout only if it is this precise.
pub const CACHE_MAX_ACCURACY: f64 = 100.0;

/// A delivered position, in GCJ-02.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    /// Provider name.
    pub provider: String,
    /// Unix epoch milliseconds of the underlying fix.
    pub timestamp: u64,
    /// Marks a provisional position. Requests answer once, so delivered
    /// reports are always final.
    #[serde(rename = "isTemp", default)]
    pub is_temp: bool,
}

impl LocationReport {
    /// Builds a report from a raw fix, converting to GCJ-02.
    #[must_use]
    pub fn from_fix(fix: &Fix) -> Self {
        let (latitude, longitude) = wgs84_to_gcj02(fix.latitude, fix.longitude);
        Self {
            latitude,
            longitude,
            accuracy: fix.accuracy,
            provider: fix.provider.as_str().to_owned(),
            timestamp: fix.timestamp,
            is_temp: false,
        }
    }

    /// Whether a cached report may stand in for a fresh fix at `now`.
    #[must_use]
    pub fn usable_from_cache(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) < MAX_FIX_AGE_MS && self.accuracy <= CACHE_MAX_ACCURACY
    }
}

/// Persistent key-value storage for the last report, like shared preferences.
pub trait ReportStore: Send + Sync {
    /// Reads the value under `key`.
    fn load(&self, key: &str) -> Option<String>;
    /// Writes `value` under `key`.
    fn save(&self, key: &str, value: String);
}

/// In-process [`ReportStore`].
#[derive(Default)]
pub struct MemoryStore {
    value: Mutex<Option<(String, String)>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl ReportStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        let guard = self.value.lock().ok()?;
        guard
            .as_ref()
            .filter(|(stored, _)| stored == key)
            .map(|(_, value)| value.clone())
    }

    fn save(&self, key: &str, value: String) {
        match self.value.lock() {
            Ok(mut guard) => *guard = Some((key.to_owned(), value)),
            Err(_) => warn!("location store lock poisoned, skipping save"),
        }
    }
}

/// Stores `report` as the latest delivered position.
pub fn save_report(store: &dyn ReportStore, report: &LocationReport) {
    match serde_json::to_string(report) {
        Ok(json) => store.save(CACHE_KEY, json),
        Err(err) => warn!("could not cache location report: {err}"),
    }
}

/// Reads the cached report if it is still usable at `now`.
#[must_use]
pub fn load_report(store: &dyn ReportStore, now: u64) -> Option<LocationReport> {
    let raw = store.load(CACHE_KEY)?;
    match serde_json::from_str::<LocationReport>(&raw) {
        Ok(report) if report.usable_from_cache(now) => Some(report),
        Ok(_) => None,
        Err(err) => {
            warn!("discarding unreadable location cache: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::Provider;

    const NOW: u64 = 1_700_000_000_000;

    fn report(accuracy: f64, age_ms: u64) -> LocationReport {
        LocationReport {
            latitude: 31.2,
            longitude: 121.5,
            accuracy,
            provider: "gps".into(),
            timestamp: NOW - age_ms,
            is_temp: false,
        }
    }

    #[test]
    fn cache_respects_age_and_accuracy() {
        let store = MemoryStore::new();
        assert!(load_report(&store, NOW).is_none());

        save_report(&store, &report(80.0, 60_000));
        assert_eq!(load_report(&store, NOW), Some(report(80.0, 60_000)));

        save_report(&store, &report(120.0, 0));
        assert!(load_report(&store, NOW).is_none());

        save_report(&store, &report(10.0, MAX_FIX_AGE_MS));
        assert!(load_report(&store, NOW).is_none());
    }

    #[test]
    fn garbage_in_store_is_ignored() {
        let store = MemoryStore::new();
        store.save(CACHE_KEY, "{not json".into());
        assert!(load_report(&store, NOW).is_none());
    }

    #[test]
    fn report_converts_and_keeps_metadata() {
        let fix = Fix {
            latitude: 39.9042,
            longitude: 116.4074,
            accuracy: 12.0,
            provider: Provider::Network,
            timestamp: NOW,
        };
        let report = LocationReport::from_fix(&fix);
        assert!(report.latitude > fix.latitude);
        assert_eq!(report.provider, "network");
        assert_eq!(report.timestamp, NOW);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["isTemp"], false);
        assert!(json.get("is_temp").is_none());
    }

    #[test]
    fn reports_cached_without_is_temp_still_load() {
        let store = MemoryStore::new();
        store.save(
            CACHE_KEY,
            format!(
                r#"{{"latitude":31.2,"longitude":121.5,"accuracy":20.0,"provider":"gps","timestamp":{NOW}}}"#
            ),
        );
        let report = load_report(&store, NOW).unwrap();
        assert!(!report.is_temp);
    }
}
