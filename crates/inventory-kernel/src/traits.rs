use async_trait::async_trait;
use inventory_types::{Actor, ActorId, ActorRef, Item, ItemId, ItemSpec, LockFlag, UserId};
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Severity of a user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// A message broadcast to the shared chat log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Alias shown as the speaker, the owning actor's name
    pub speaker: String,
    pub html: String,
}

/// Resolves whether a user is a referee / GM-equivalent.
///
/// Only the hook adapters consult this; the guard receives privilege as an
/// explicit field of the request.
pub trait PrivilegeOracle: Send + Sync {
    fn is_privileged(&self, user: &UserId) -> bool;
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Open item editors. Asked to re-render after a rejected edit so the
/// rejected value disappears from the form.
pub trait EditorSurface: Send + Sync {
    fn rerender(&self, item: &ItemId);
}

#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn broadcast(&self, message: ChatMessage) -> Result<(), HostError>;
}

#[async_trait]
pub trait AudioChannel: Send + Sync {
    async fn play(&self, path: &str) -> Result<(), HostError>;
}

/// Item collection operations of the host.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Snapshot of the actor and all of its items.
    async fn actor(&self, id: &ActorId) -> Result<Actor, HostError>;

    async fn create_items(
        &self,
        actor: &ActorId,
        specs: Vec<ItemSpec>,
    ) -> Result<Vec<Item>, HostError>;

    /// Delete an item. Deleting a container moves its contents to the
    /// actor's root inventory; that redistribution is the host's job.
    async fn delete_item(&self, actor: &ActorId, item: &ItemId) -> Result<(), HostError>;
}

/// Persisted `inventoryLocked` flag storage.
#[async_trait]
pub trait LockFlagStore: Send + Sync {
    async fn lock_flag(&self, actor: &ActorId) -> Result<LockFlag, HostError>;

    async fn set_lock_flag(&self, actor: &ActorId, locked: bool) -> Result<(), HostError>;
}

/// Result reported by the external advancement subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvancementOutcome {
    /// A class gained a level
    Advanced { class: String, level: u32 },
    /// The character has no class item to advance
    NoClassItem,
}

/// External leveling workflow. Not modeled here beyond this seam.
///
/// `advance` resolves once the whole flow has finished, including any
/// interactive steps, so the caller can close the inventory gate afterwards.
#[async_trait]
pub trait AdvancementWorkflow: Send + Sync {
    async fn advance(&self, actor: &ActorRef) -> Result<AdvancementOutcome, HostError>;
}
