use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Fixes older than this are discarded.
pub const MAX_FIX_AGE_MS: u64 = 5 * 60 * 1000;
/// Fixes less precise than this are discarded.
pub const MAX_FIX_ACCURACY: f64 = 300.0;
/// A last-known fix seeds the search only if it is this fresh.
pub const SEED_MAX_AGE_MS: u64 = 30 * 1000;
/// A last-known fix seeds the search only if it is this precise.
pub const SEED_MAX_ACCURACY: f64 = 50.0;

/// Source of a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Satellite positioning.
    Gps,
    /// Cell and Wi-Fi positioning.
    Network,
    /// Fixes requested by other apps.
    Passive,
}

impl Provider {
    /// Platform provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gps => "gps",
            Self::Network => "network",
            Self::Passive => "passive",
        }
    }

    const fn weight(self) -> u8 {
        match self {
            Self::Gps => 10,
            Self::Network => 2,
            Self::Passive => 1,
        }
    }
}

/// A raw WGS-84 fix reported by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    /// Reporting provider.
    pub provider: Provider,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
}

impl Fix {
    /// Age of the fix at `now` (epoch ms).
    #[must_use]
    pub const fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// Whether the fix is usable at all.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_valid(&self, now: u64) -> bool {
        self.latitude != 0.0
            && self.longitude != 0.0
            && self.accuracy > 0.0
            && self.accuracy <= MAX_FIX_ACCURACY
            && self.age(now) < MAX_FIX_AGE_MS
    }

    /// Whether a last-known fix is good enough to start from.
    #[must_use]
    pub fn is_fresh_seed(&self, now: u64) -> bool {
        self.is_valid(now) && self.age(now) < SEED_MAX_AGE_MS && self.accuracy <= SEED_MAX_ACCURACY
    }

    /// Whether `self` should replace `current` as the best candidate.
    ///
    /// GPS always beats other providers. Within one provider the smaller
    /// accuracy radius wins. Across providers a fix worse by more than 50 m
    /// loses, otherwise the newer fix wins.
    #[must_use]
    pub fn is_better_than(&self, current: Option<&Self>) -> bool {
        let Some(current) = current else {
            return true;
        };
        let new_gps = self.provider == Provider::Gps;
        let old_gps = current.provider == Provider::Gps;
        if new_gps != old_gps {
            return new_gps;
        }
        if self.provider == current.provider {
            return self.accuracy < current.accuracy;
        }
        if self.accuracy - current.accuracy > 50.0 {
            return false;
        }
        self.timestamp > current.timestamp
    }
}

/// Picks the best seed among last-known fixes: the highest-weighted provider
/// among those fresh enough.
#[must_use]
pub fn pick_seed(candidates: impl IntoIterator<Item = Fix>, now: u64) -> Option<Fix> {
    candidates
        .into_iter()
        .filter(|fix| fix.is_fresh_seed(now))
        .max_by_key(|fix| fix.provider.weight())
}

/// Current Unix time in milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
