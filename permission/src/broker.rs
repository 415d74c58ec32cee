use std::fmt;
use std::sync::Arc;

use bridgekit_bridge::{CallbackRegistry, ChannelCallback, Outcome};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{GRANTED, Permission, PermissionBackend, PermissionError, PermissionStatus};

/// Registry id a prompt answer for `request_code` is delivered under.
#[must_use]
pub fn result_id(request_code: i32) -> String {
    format!("onRequestPermissionsResult:{request_code}")
}

/// Answer of one permission prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResult {
    /// Code the prompt was shown with.
    pub request_code: i32,
    /// Platform permission names, in prompt order.
    pub permissions: Vec<String>,
    /// One of [`GRANTED`] or [`crate::DENIED`] per permission.
    pub grant_results: Vec<i32>,
}

impl PermissionResult {
    fn already_granted(permissions: &[Permission], request_code: i32) -> Self {
        let permissions: Vec<String> = permissions
            .iter()
            .flat_map(|p| p.platform_names().iter().map(|name| (*name).to_owned()))
            .collect();
        let grant_results = vec![GRANTED; permissions.len()];
        Self {
            request_code,
            permissions,
            grant_results,
        }
    }

    /// Whether every requested permission was granted.
    #[must_use]
    pub fn all_granted(&self) -> bool {
        !self.grant_results.is_empty() && self.grant_results.iter().all(|r| *r == GRANTED)
    }

    /// Whether at least one requested permission was granted.
    #[must_use]
    pub fn any_granted(&self) -> bool {
        self.grant_results.contains(&GRANTED)
    }
}

/// Requests permissions and waits for the host to deliver the answer.
#[derive(Clone)]
pub struct PermissionBroker {
    registry: Arc<CallbackRegistry>,
    backend: Arc<dyn PermissionBackend>,
}

impl PermissionBroker {
    /// Creates a broker parking pending prompts in `registry`.
    #[must_use]
    pub fn new(registry: Arc<CallbackRegistry>, backend: Arc<dyn PermissionBackend>) -> Self {
        Self { registry, backend }
    }

    /// Current status of `permission`.
    pub async fn check(&self, permission: Permission) -> PermissionStatus {
        self.backend.check(permission).await
    }

    /// Prompts for `permissions` unless all are granted, then waits for the answer.
    ///
    /// # Errors
    ///
    /// Fails if the prompt cannot be shown, the pending request is dropped, or
    /// the delivered answer is malformed.
    pub async fn request(
        &self,
        permissions: &[Permission],
        request_code: i32,
    ) -> Result<PermissionResult, PermissionError> {
        let mut all_granted = true;
        for permission in permissions {
            if self.backend.check(*permission).await != PermissionStatus::Granted {
                all_granted = false;
                break;
            }
        }
        if all_granted {
            return Ok(PermissionResult::already_granted(permissions, request_code));
        }

        let id = result_id(request_code);
        let (callback, answers) = ChannelCallback::pair();
        self.registry.register(&id, Some(callback));

        if let Err(err) = self.backend.prompt(permissions, request_code) {
            self.registry.remove(&id);
            return Err(err);
        }
        debug!("waiting for permission answer {request_code}");

        match answers.recv().await {
            Ok(Outcome::Success(value)) => serde_json::from_value(value)
                .map_err(|err| PermissionError::Malformed(err.to_string())),
            Ok(Outcome::Error(message)) => Err(PermissionError::Prompt(message)),
            Err(_) => Err(PermissionError::Abandoned(request_code)),
        }
    }

    /// Prompts for a single permission and requires every part of it granted.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Denied`] if the user refuses, or any error of
    /// [`PermissionBroker::request`].
    pub async fn ensure(&self, permission: Permission) -> Result<(), PermissionError> {
        let result = self.request(&[permission], permission.request_code()).await?;
        let granted = match permission {
            Permission::Location => result.any_granted(),
            _ => result.all_granted(),
        };
        if granted {
            Ok(())
        } else {
            Err(PermissionError::Denied)
        }
    }

    /// Entry point for the host's `onRequestPermissionsResult`.
    ///
    /// Returns `false` when no request with `request_code` is pending.
    pub fn deliver_result(
        &self,
        request_code: i32,
        permissions: &[String],
        grant_results: &[i32],
    ) -> bool {
        let id = result_id(request_code);
        if !self.registry.contains(&id) {
            warn!("permission answer {request_code} has no pending request");
            return false;
        }
        self.registry.invoke(
            &id,
            json!({
                "requestCode": request_code,
                "permissions": permissions,
                "grantResults": grant_results,
            }),
        );
        true
    }
}

impl fmt::Debug for PermissionBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionBroker")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
