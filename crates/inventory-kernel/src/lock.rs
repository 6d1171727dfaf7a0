use std::sync::Arc;

use inventory_types::{ActorRef, LockFlag};
use tracing::info;

use crate::error::LockError;
use crate::traits::{LockFlagStore, NoticeLevel, Notifier};

/// Opens and closes an actor's inventory gate.
///
/// The only writer of the `inventoryLocked` flag. Both operations are
/// idempotent and announce the new state every time they run.
pub struct LockToggleService {
    flags: Arc<dyn LockFlagStore>,
    notifier: Arc<dyn Notifier>,
}

impl LockToggleService {
    pub fn new(flags: Arc<dyn LockFlagStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { flags, notifier }
    }

    pub async fn lock(&self, actor: &ActorRef) -> Result<(), LockError> {
        self.set(actor, true).await
    }

    pub async fn unlock(&self, actor: &ActorRef) -> Result<(), LockError> {
        self.set(actor, false).await
    }

    /// Current persisted flag.
    pub async fn state(&self, actor: &ActorRef) -> Result<LockFlag, LockError> {
        self.flags
            .lock_flag(&actor.id)
            .await
            .map_err(|source| LockError::Read {
                actor: actor.id.clone(),
                source,
            })
    }

    async fn set(&self, actor: &ActorRef, locked: bool) -> Result<(), LockError> {
        self.flags
            .set_lock_flag(&actor.id, locked)
            .await
            .map_err(|source| LockError::Write {
                actor: actor.id.clone(),
                source,
            })?;

        info!(actor = %actor.id, locked, "Inventory lock updated");
        self.notifier.notify(
            NoticeLevel::Info,
            &format!("{}: inventoryLocked = {}", actor.name, locked),
        );
        Ok(())
    }
}
