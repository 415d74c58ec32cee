use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_channel::unbounded;
use bridgekit_permission::{Permission, PermissionBroker, PermissionError};
use futures::future::{Either, select};
use futures::pin_mut;
use futures_timer::Delay;
use log::{debug, warn};

use crate::cache::{LocationReport, ReportStore, load_report, save_report};
use crate::fix::{Fix, Provider, now_millis, pick_seed};
use crate::{LocationBackend, LocationError, LocationRequest};

const PROVIDERS: [Provider; 2] = [Provider::Gps, Provider::Network];

/// Runs one-shot location searches.
#[derive(Clone)]
pub struct LocationManager {
    backend: Arc<dyn LocationBackend>,
    permissions: PermissionBroker,
    store: Arc<dyn ReportStore>,
}

impl LocationManager {
    /// Creates a manager.
    #[must_use]
    pub fn new(
        backend: Arc<dyn LocationBackend>,
        permissions: PermissionBroker,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            backend,
            permissions,
            store,
        }
    }

    /// Locates the device.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::PermissionDenied`] if the user refuses
    /// location permission, [`LocationError::PermissionUnavailable`] if the
    /// prompt itself fails, [`LocationError::ServiceDisabled`] if both
    /// providers are off and [`LocationError::Timeout`] if nothing usable
    /// turned up in time.
    pub async fn locate(&self, request: LocationRequest) -> Result<LocationReport, LocationError> {
        match self.permissions.ensure(Permission::Location).await {
            Ok(()) => {}
            Err(PermissionError::Denied) => return Err(LocationError::PermissionDenied),
            Err(err) => {
                warn!("location permission request failed: {err}");
                return Err(LocationError::PermissionUnavailable(err.to_string()));
            }
        }
        self.locate_unchecked(request).await
    }

    /// Locates the device without asking for permission first.
    ///
    /// # Errors
    ///
    /// Same as [`LocationManager::locate`] minus the permission check.
    pub async fn locate_unchecked(
        &self,
        request: LocationRequest,
    ) -> Result<LocationReport, LocationError> {
        let enabled: Vec<Provider> = PROVIDERS
            .into_iter()
            .filter(|p| self.backend.is_provider_enabled(*p))
            .collect();
        if enabled.is_empty() {
            return Err(LocationError::ServiceDisabled);
        }

        let now = now_millis();
        let mut best = pick_seed(
            PROVIDERS.into_iter().filter_map(|p| self.backend.last_known(p)),
            now,
        );
        if let Some(seed) = &best {
            debug!("seeded location search with a {} fix", seed.provider.as_str());
        }

        self.backend.refresh_assistance();

        let (sink, fixes) = unbounded();
        for provider in enabled {
            self.backend.start_updates(provider, sink.clone());
        }
        drop(sink);

        let deadline = Delay::new(Duration::from_millis(request.timeout_ms));
        pin_mut!(deadline);

        let accepted = loop {
            let next = fixes.recv();
            pin_mut!(next);
            match select(next, deadline.as_mut()).await {
                Either::Left((Ok(fix), _)) => {
                    if !fix.is_valid(now_millis()) {
                        continue;
                    }
                    if fix.is_better_than(best.as_ref()) {
                        best = Some(fix.clone());
                    }
                    if fix.provider == Provider::Gps || fix.accuracy <= request.accuracy {
                        break Some(fix);
                    }
                }
                Either::Left((Err(_), remaining)) => {
                    debug!("all location providers closed, waiting out the deadline");
                    remaining.await;
                    break None;
                }
                Either::Right(((), _)) => break None,
            }
        };
        self.backend.stop_updates();

        if let Some(fix) = accepted.or(best) {
            return Ok(self.deliver(&fix));
        }
        load_report(self.store.as_ref(), now_millis()).ok_or(LocationError::Timeout)
    }

    fn deliver(&self, fix: &Fix) -> LocationReport {
        let report = LocationReport::from_fix(fix);
        save_report(self.store.as_ref(), &report);
        report
    }
}

impl fmt::Debug for LocationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationManager")
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}
