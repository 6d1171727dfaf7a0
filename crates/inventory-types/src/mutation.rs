use serde::{Deserialize, Serialize};

use crate::actor::{ActorRef, LockFlag};
use crate::ids::{ActorId, ItemId, UserId};
use crate::item::{ItemSpec, ItemUpdate};

/// The user behind a request, with privilege resolved up front.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requester {
    pub user: UserId,
    /// Referee / GM-equivalent
    pub privileged: bool,
}

impl Requester {
    pub fn player(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            privileged: false,
        }
    }

    pub fn game_master(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            privileged: true,
        }
    }
}

/// Where a mutation request came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOrigin {
    /// Direct manipulation of a sheet or editor
    Interaction,
    /// System or workflow driven (loot, crafting, scripts)
    Programmatic,
}

impl MutationOrigin {
    pub fn is_interaction(&self) -> bool {
        matches!(self, MutationOrigin::Interaction)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// A mutation against an actor's item collection that has not been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ProposedMutation {
    Create { spec: ItemSpec },
    Update { item: ItemId, changes: ItemUpdate },
    Delete { item: ItemId },
}

impl ProposedMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            ProposedMutation::Create { .. } => MutationKind::Create,
            ProposedMutation::Update { .. } => MutationKind::Update,
            ProposedMutation::Delete { .. } => MutationKind::Delete,
        }
    }

    /// Existing item targeted by the mutation, if any.
    pub fn target(&self) -> Option<&ItemId> {
        match self {
            ProposedMutation::Create { .. } => None,
            ProposedMutation::Update { item, .. } | ProposedMutation::Delete { item } => Some(item),
        }
    }
}

/// Everything the guard needs to decide a proposed mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub actor: ActorRef,
    /// Lock flag as read when the mutation was proposed
    pub lock: LockFlag,
    pub requester: Requester,
    pub origin: MutationOrigin,
    pub mutation: ProposedMutation,
}

/// Notification that an update was durably applied by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub actor: ActorId,
    pub item: ItemId,
    pub changes: ItemUpdate,
    pub requester: Requester,
}
