use inventory_types::{ActorId, ItemId};
use thiserror::Error;

/// Failures reported by host collaborators (storage, chat, audio).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("host rejected operation: {0}")]
    Rejected(String),

    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// Lock-flag persistence failures. Always propagated to the caller.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("failed to read inventory lock for {actor}: {source}")]
    Read {
        actor: ActorId,
        #[source]
        source: HostError,
    },

    #[error("failed to persist inventory lock for {actor}: {source}")]
    Write {
        actor: ActorId,
        #[source]
        source: HostError,
    },
}

/// Failures of the container break sequence.
///
/// `RemnantCreation` and `ContainerDeletion` leave the actor inconsistent:
/// the destruction was already announced, and either the container is still
/// present over capacity or a remnant now sits next to the original.
/// `ContainerLookup` happens before any step ran.
#[derive(Error, Debug)]
pub enum BreakError {
    #[error("could not re-read container {container} before breaking it: {source}")]
    ContainerLookup {
        container: ItemId,
        #[source]
        source: HostError,
    },

    #[error("broken remnant for container {container} could not be created: {source}")]
    RemnantCreation {
        container: ItemId,
        #[source]
        source: HostError,
    },

    #[error("container {container} could not be deleted after remnant {remnant} was created: {source}")]
    ContainerDeletion {
        container: ItemId,
        remnant: ItemId,
        #[source]
        source: HostError,
    },
}

impl BreakError {
    pub fn container(&self) -> &ItemId {
        match self {
            BreakError::ContainerLookup { container, .. }
            | BreakError::RemnantCreation { container, .. }
            | BreakError::ContainerDeletion { container, .. } => container,
        }
    }

    /// Whether the actor was left needing manual repair.
    pub fn is_state_corrupting(&self) -> bool {
        !matches!(self, BreakError::ContainerLookup { .. })
    }
}

/// Failures that abort a whole overload scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("could not load actor {actor} for scanning: {source}")]
    ActorUnavailable {
        actor: ActorId,
        #[source]
        source: HostError,
    },
}

/// Top-level error surfaced by [`crate::InventoryKernel`].
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("advancement workflow failed for {actor}: {reason}")]
    Advancement { actor: ActorId, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
