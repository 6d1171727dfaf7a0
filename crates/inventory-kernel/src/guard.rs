use std::sync::Arc;

use inventory_types::{ItemField, MutationRequest, ProposedMutation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DeletePolicy, GuardConfig};
use crate::traits::{EditorSurface, NoticeLevel, Notifier};

pub const QUANTITY_EDIT_DENIED: &str = "You cannot change item quantities directly.";
pub const MANUAL_CREATE_DENIED: &str = "You cannot manually add items.";
pub const MANUAL_DELETE_DENIED: &str = "You cannot manually delete items.";

/// Why a mutation was let through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    /// Requester is a referee / GM-equivalent
    Privileged,
    /// Actor's lock flag is explicitly `false`
    Unlocked,
    /// No guard rule applies to this mutation
    Unguarded,
}

/// Why a mutation was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialReason {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow { reason: AllowReason },
    Deny { reason: DenialReason },
}

impl GuardDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GuardDecision::Allow { .. })
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, GuardDecision::Deny { .. })
    }

    fn allow(reason: AllowReason) -> Self {
        GuardDecision::Allow { reason }
    }

    fn deny(code: &str, message: &str) -> Self {
        GuardDecision::Deny {
            reason: DenialReason {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Gate in front of an actor's item collection.
///
/// Rules, first match wins:
/// 1. privileged requester: allow
/// 2. lock flag explicitly `false`: allow (an unset flag does not count)
/// 3. update touching `quantity` from an interaction: deny
/// 4. create from an interaction: deny
/// 5. delete: allow, or the create rule under [`DeletePolicy::SameAsCreate`]
///
/// Deciding is synchronous and reads only the request, so concurrent
/// proposals for the same actor need no coordination here.
pub struct MutationGuard {
    config: GuardConfig,
    notifier: Arc<dyn Notifier>,
    editors: Arc<dyn EditorSurface>,
}

impl MutationGuard {
    pub fn new(
        config: GuardConfig,
        notifier: Arc<dyn Notifier>,
        editors: Arc<dyn EditorSurface>,
    ) -> Self {
        Self {
            config,
            notifier,
            editors,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Pure policy decision, no side effects.
    pub fn decide(&self, request: &MutationRequest) -> GuardDecision {
        evaluate(self.config.delete_policy, request)
    }

    /// Propose-hook entry point: decide, and on denial notify the user and
    /// ask the item's editor to discard the rejected edit.
    pub fn intercept(&self, request: &MutationRequest) -> GuardDecision {
        debug!(
            actor = %request.actor.name,
            op = %request.mutation.kind(),
            origin = ?request.origin,
            lock = %request.lock,
            privileged = request.requester.privileged,
            "Mutation proposed"
        );

        let decision = self.decide(request);

        if let GuardDecision::Deny { reason } = &decision {
            warn!(
                actor = %request.actor.id,
                user = %request.requester.user,
                code = %reason.code,
                "Guard denied inventory mutation"
            );
            self.notifier.notify(NoticeLevel::Error, &reason.message);
            if let Some(item) = request.mutation.target() {
                self.editors.rerender(item);
            }
        }

        decision
    }
}

fn evaluate(delete_policy: DeletePolicy, request: &MutationRequest) -> GuardDecision {
    if request.requester.privileged {
        return GuardDecision::allow(AllowReason::Privileged);
    }

    if request.lock.is_explicitly_unlocked() {
        return GuardDecision::allow(AllowReason::Unlocked);
    }

    let from_interaction = request.origin.is_interaction();

    match &request.mutation {
        ProposedMutation::Update { changes, .. } => {
            if from_interaction && changes.touches(ItemField::Quantity) {
                return GuardDecision::deny("QUANTITY_EDIT", QUANTITY_EDIT_DENIED);
            }
        }
        ProposedMutation::Create { .. } => {
            if from_interaction {
                return GuardDecision::deny("MANUAL_CREATE", MANUAL_CREATE_DENIED);
            }
        }
        ProposedMutation::Delete { .. } => {
            if delete_policy == DeletePolicy::SameAsCreate && from_interaction {
                return GuardDecision::deny("MANUAL_DELETE", MANUAL_DELETE_DENIED);
            }
        }
    }

    GuardDecision::allow(AllowReason::Unguarded)
}
