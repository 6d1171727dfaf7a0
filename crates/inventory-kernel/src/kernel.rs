use std::sync::Arc;

use inventory_types::{
    ActorId, ActorRef, CommitEvent, ItemId, ItemKind, ItemUpdate, MutationOrigin,
    MutationRequest, ProposedMutation, Requester, UserId,
};
use tracing::{error, info, warn};

use crate::advancement::LevelUpSession;
use crate::breaker::ContainerBreakHandler;
use crate::config::KernelConfig;
use crate::error::{KernelError, LockError};
use crate::guard::{GuardDecision, MutationGuard};
use crate::lock::LockToggleService;
use crate::scanner::{OverloadScanner, ScanReport};
use crate::traits::{
    AdvancementOutcome, AdvancementWorkflow, AudioChannel, ChatChannel, EditorSurface, ItemStore,
    LockFlagStore, NoticeLevel, Notifier, PrivilegeOracle,
};

/// Host collaborators the kernel is wired to.
#[derive(Clone)]
pub struct HostBindings {
    pub privileges: Arc<dyn PrivilegeOracle>,
    pub notifier: Arc<dyn Notifier>,
    pub editors: Arc<dyn EditorSurface>,
    pub chat: Arc<dyn ChatChannel>,
    pub audio: Arc<dyn AudioChannel>,
    pub items: Arc<dyn ItemStore>,
    pub flags: Arc<dyn LockFlagStore>,
    pub advancement: Arc<dyn AdvancementWorkflow>,
}

impl HostBindings {
    /// Bind every seam to one host object.
    pub fn from_host<H>(host: Arc<H>, advancement: Arc<dyn AdvancementWorkflow>) -> Self
    where
        H: PrivilegeOracle
            + Notifier
            + EditorSurface
            + ChatChannel
            + AudioChannel
            + ItemStore
            + LockFlagStore
            + 'static,
    {
        Self {
            privileges: host.clone(),
            notifier: host.clone(),
            editors: host.clone(),
            chat: host.clone(),
            audio: host.clone(),
            items: host.clone(),
            flags: host,
            advancement,
        }
    }
}

/// The inventory integrity kernel.
///
/// Owns the guard, the lock toggle, the level-up session and the overload
/// scanner, and exposes the two host interception points: [`Self::on_propose`]
/// before a mutation is applied and [`Self::on_commit`] after an update has
/// been applied.
pub struct InventoryKernel {
    config: KernelConfig,
    privileges: Arc<dyn PrivilegeOracle>,
    flags: Arc<dyn LockFlagStore>,
    notifier: Arc<dyn Notifier>,
    guard: MutationGuard,
    locks: Arc<LockToggleService>,
    level_up: LevelUpSession,
    scanner: OverloadScanner,
}

impl InventoryKernel {
    pub fn new(config: KernelConfig, host: HostBindings) -> Self {
        let guard = MutationGuard::new(
            config.guard.clone(),
            host.notifier.clone(),
            host.editors.clone(),
        );
        let locks = Arc::new(LockToggleService::new(
            host.flags.clone(),
            host.notifier.clone(),
        ));
        let level_up = LevelUpSession::new(
            locks.clone(),
            host.advancement.clone(),
            host.notifier.clone(),
        );
        let breaker = Arc::new(ContainerBreakHandler::new(
            config.overload.clone(),
            host.items.clone(),
            host.chat.clone(),
            host.audio.clone(),
        ));
        let scanner = OverloadScanner::new(
            config.overload.clone(),
            host.items.clone(),
            host.chat.clone(),
            breaker,
        );

        info!(
            delete_policy = ?config.guard.delete_policy,
            scan_trigger = ?config.overload.scan_trigger,
            bulge_margin = config.overload.bulge_margin,
            "Inventory kernel initialized"
        );

        Self {
            config,
            privileges: host.privileges,
            flags: host.flags,
            notifier: host.notifier,
            guard,
            locks,
            level_up,
            scanner,
        }
    }

    /// Load configuration from `path` (plus environment) and build the kernel.
    pub fn from_config(path: Option<&str>, host: HostBindings) -> Result<Self, KernelError> {
        let config = KernelConfig::load(path)?;
        Ok(Self::new(config, host))
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn guard(&self) -> &MutationGuard {
        &self.guard
    }

    pub fn scanner(&self) -> &OverloadScanner {
        &self.scanner
    }

    /// Resolve a user into an explicit requester.
    pub fn requester(&self, user: &UserId) -> Requester {
        Requester {
            user: user.clone(),
            privileged: self.privileges.is_privileged(user),
        }
    }

    /// Decide a fully formed request, with denial side effects.
    pub fn propose(&self, request: &MutationRequest) -> GuardDecision {
        self.guard.intercept(request)
    }

    /// Propose-hook adapter: reads the actor's lock flag and the user's
    /// privilege, then runs the guard.
    pub async fn on_propose(
        &self,
        actor: &ActorRef,
        user: &UserId,
        origin: MutationOrigin,
        mutation: ProposedMutation,
    ) -> Result<GuardDecision, KernelError> {
        let lock = self
            .flags
            .lock_flag(&actor.id)
            .await
            .map_err(|source| LockError::Read {
                actor: actor.id.clone(),
                source,
            })?;

        let request = MutationRequest {
            actor: actor.clone(),
            lock,
            requester: self.requester(user),
            origin,
            mutation,
        };
        Ok(self.propose(&request))
    }

    /// Commit-hook adapter.
    pub async fn on_commit(
        &self,
        actor: &ActorId,
        item: &ItemId,
        changes: ItemUpdate,
        user: &UserId,
    ) -> Result<ScanReport, KernelError> {
        let event = CommitEvent {
            actor: actor.clone(),
            item: item.clone(),
            changes,
            requester: self.requester(user),
        };
        self.committed(&event).await
    }

    /// Run the overload scan for a committed update.
    ///
    /// Break failures stay in the report; the ones that left the actor
    /// needing manual repair are also escalated to the user.
    pub async fn committed(&self, event: &CommitEvent) -> Result<ScanReport, KernelError> {
        let report = self.scanner.on_committed(event).await?;

        for failure in &report.failures {
            if !failure.is_state_corrupting() {
                warn!(
                    actor = %report.actor,
                    container = %failure.container(),
                    error = %failure,
                    "Container break did not start, will retry on next scan"
                );
                continue;
            }
            error!(
                actor = %report.actor,
                container = %failure.container(),
                error = %failure,
                "Container break left actor inconsistent"
            );
            self.notifier.notify(
                NoticeLevel::Error,
                &format!("Container break failed, manual cleanup needed: {failure}"),
            );
        }

        Ok(report)
    }

    pub async fn lock(&self, actor: &ActorRef) -> Result<(), KernelError> {
        Ok(self.locks.lock(actor).await?)
    }

    pub async fn unlock(&self, actor: &ActorRef) -> Result<(), KernelError> {
        Ok(self.locks.unlock(actor).await?)
    }

    pub async fn level_up(&self, actor: &ActorRef) -> Result<AdvancementOutcome, KernelError> {
        self.level_up.run(actor).await
    }

    pub async fn on_item_browse(
        &self,
        actor: &ActorRef,
        kind: ItemKind,
    ) -> Result<bool, KernelError> {
        self.level_up.on_item_browse(actor, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::memory::{InMemoryHost, ScriptedAdvancement};
    use inventory_types::{Actor, Item, LockFlag};

    fn kernel() -> (InventoryKernel, Arc<InMemoryHost>, ActorRef) {
        let host = Arc::new(InMemoryHost::new());
        host.grant_privilege("gm");
        let actor = Actor::new("hero", "Aria")
            .with_lock(LockFlag::Locked)
            .with_item(
                Item::new(ActorId::from("hero"), "Backpack", ItemKind::Container)
                    .with_id("pack")
                    .with_capacity(20.0)
                    .with_contents_weight(4.0),
            );
        let reference = actor.reference();
        host.insert_actor(actor);

        let bindings = HostBindings::from_host(
            host.clone(),
            Arc::new(ScriptedAdvancement::advanced("Fighter", 2)),
        );
        (InventoryKernel::new(KernelConfig::default(), bindings), host, reference)
    }

    #[test]
    fn requester_privilege_comes_from_oracle() {
        let (kernel, _, _) = kernel();
        assert!(kernel.requester(&UserId::from("gm")).privileged);
        assert!(!kernel.requester(&UserId::from("p1")).privileged);
    }

    #[tokio::test]
    async fn propose_hook_reads_persisted_lock() {
        let (kernel, _, actor) = kernel();
        let create = ProposedMutation::Create {
            spec: inventory_types::ItemSpec::new("Gem", ItemKind::Loot),
        };

        let locked = kernel
            .on_propose(&actor, &UserId::from("p1"), MutationOrigin::Interaction, create.clone())
            .await
            .unwrap();
        assert!(locked.is_deny());

        kernel.unlock(&actor).await.unwrap();
        let unlocked = kernel
            .on_propose(&actor, &UserId::from("p1"), MutationOrigin::Interaction, create)
            .await
            .unwrap();
        assert!(unlocked.is_allow());
    }

    #[tokio::test]
    async fn propose_hook_fails_for_unknown_actor() {
        let (kernel, _, _) = kernel();
        let ghost = ActorRef::new("ghost", "Nobody");
        let err = kernel
            .on_propose(
                &ghost,
                &UserId::from("p1"),
                MutationOrigin::Interaction,
                ProposedMutation::Delete {
                    item: ItemId::from("x"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::Lock(LockError::Read { .. })));
    }

    #[tokio::test]
    async fn break_failure_is_escalated() {
        let (kernel, host, _) = kernel();
        host.fail_creates(HostError::Rejected("quota exceeded".into()));
        host.apply_update(
            &ActorId::from("hero"),
            &ItemId::from("pack"),
            &ItemUpdate::new().contents_weight(30.0),
        )
        .unwrap();

        let report = kernel
            .on_commit(
                &ActorId::from("hero"),
                &ItemId::from("pack"),
                ItemUpdate::new().contents_weight(30.0),
                &UserId::from("gm"),
            )
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        let errors = host.notices_at(NoticeLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("manual cleanup needed"));
    }

    #[tokio::test]
    async fn level_up_leaves_actor_locked() {
        let (kernel, host, actor) = kernel();
        let outcome = kernel.level_up(&actor).await.unwrap();

        assert_eq!(
            outcome,
            AdvancementOutcome::Advanced {
                class: "Fighter".into(),
                level: 2
            }
        );
        assert_eq!(
            host.snapshot(&actor.id).unwrap().lock,
            LockFlag::Locked
        );
    }
}
