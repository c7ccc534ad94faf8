//! Scoped lock handle

use std::sync::Arc;

use steward_common::{Result, StewardError};
use uuid::Uuid;

use super::config::LockConfig;
use super::model::{LockAcquireRequest, LockReleaseRequest};
use super::service::DistributedLockService;

/// A held lock.
///
/// Call [`LockGuard::release`] to release and observe the outcome. A guard
/// dropped without release hands the release to the runtime in the
/// background, and the lease bounds the hold if that fails too.
pub struct LockGuard {
    service: Arc<dyn DistributedLockService>,
    namespace: String,
    name: String,
    owner: String,
    fence_token: u64,
    released: bool,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("fence_token", &self.fence_token)
            .finish()
    }
}

impl LockGuard {
    /// Acquire `name` with the configured lease and wait budget.
    ///
    /// Fails with [`StewardError::LockUnavailable`] when the lock cannot be
    /// taken in time or the lock service errors.
    pub async fn acquire(
        service: Arc<dyn DistributedLockService>,
        config: &LockConfig,
        name: &str,
    ) -> Result<Self> {
        let owner = Uuid::new_v4().to_string();
        let request = LockAcquireRequest {
            namespace: config.namespace.clone(),
            name: name.to_string(),
            owner: owner.clone(),
            ttl_ms: config.ttl_ms,
            wait_ms: config.wait_ms,
        };

        let result = service
            .acquire(request)
            .await
            .map_err(|e| StewardError::LockUnavailable(name.to_string(), e.to_string()))?;

        if !result.acquired {
            let reason = result
                .error
                .unwrap_or_else(|| "lock is held by another owner".to_string());
            return Err(StewardError::LockUnavailable(name.to_string(), reason));
        }

        tracing::trace!(lock = name, fence_token = result.fence_token, "Lock acquired");

        Ok(Self {
            service,
            namespace: config.namespace.clone(),
            name: name.to_string(),
            owner,
            fence_token: result.fence_token,
            released: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fence_token(&self) -> u64 {
        self.fence_token
    }

    fn release_request(&self) -> LockReleaseRequest {
        LockReleaseRequest {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            fence_token: Some(self.fence_token),
        }
    }

    /// Release the lock.
    ///
    /// Errors when the lock service fails or the lease was lost before release.
    pub async fn release(mut self) -> Result<()> {
        let request = self.release_request();
        let outcome = self.service.release(request).await;
        self.released = true;

        let result = outcome?;
        if !result.released {
            return Err(StewardError::LockError(format!(
                "lock '{}' was not released: {}",
                self.name,
                result.error.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let request = self.release_request();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let service = self.service.clone();
                handle.spawn(async move {
                    if let Err(e) = service.release(request).await {
                        tracing::warn!(error = %e, "Background lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    lock = %self.name,
                    "Lock guard dropped outside a runtime, lock held until lease expiry"
                );
            }
        }
    }
}
