//! Per-family processing lock for batch runs.

use tracing::{debug, error, warn};
use uuid::Uuid;

use boardshelf_shared::{FamilyId, Result};
use boardshelf_storage::Storage;

/// Claim the lock for `family_id` with `token`. Returns `false` when another
/// token holds it.
pub async fn acquire(storage: &Storage, family_id: &FamilyId, token: &str) -> Result<bool> {
    storage.try_lock_family(family_id, token).await
}

/// Release the lock held by `token`.
pub async fn release(storage: &Storage, family_id: &FamilyId, token: &str) -> Result<()> {
    if !storage.unlock_family(family_id, Some(token)).await? {
        warn!(%family_id, "processing lock was not held by this run");
    }
    Ok(())
}

/// Operator release of a stuck lock, regardless of holder.
pub async fn force_release(storage: &Storage, family_id: &FamilyId) -> Result<bool> {
    storage.unlock_family(family_id, None).await
}

/// A held family lock.
///
/// Prefer [`FamilyLock::release`]. A lock dropped while still held (a
/// cancelled run, a panic) is released on a background task instead.
pub struct FamilyLock {
    storage: Storage,
    family_id: FamilyId,
    token: String,
    released: bool,
}

impl FamilyLock {
    /// Try to take the lock with a fresh token.
    pub async fn acquire(storage: &Storage, family_id: &FamilyId) -> Result<Option<Self>> {
        let token = Uuid::now_v7().to_string();
        if !acquire(storage, family_id, &token).await? {
            return Ok(None);
        }
        debug!(%family_id, %token, "processing lock acquired");
        Ok(Some(Self {
            storage: storage.clone(),
            family_id: family_id.clone(),
            token,
            released: false,
        }))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        release(&self.storage, &self.family_id, &self.token).await?;
        debug!(family_id = %self.family_id, "processing lock released");
        Ok(())
    }
}

impl std::fmt::Debug for FamilyLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyLock")
            .field("family_id", &self.family_id)
            .field("token", &self.token)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for FamilyLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(
                family_id = %self.family_id,
                token = %self.token,
                "processing lock dropped outside a runtime; clear it with `boardshelf family unlock`"
            );
            return;
        };

        warn!(family_id = %self.family_id, "processing lock dropped while held, releasing");
        let storage = self.storage.clone();
        let family_id = self.family_id.clone();
        let token = std::mem::take(&mut self.token);
        handle.spawn(async move {
            if let Err(e) = release(&storage, &family_id, &token).await {
                error!(%family_id, error = %e, "failed to release dropped processing lock");
            }
        });
    }
}
