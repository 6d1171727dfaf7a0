//! Level-up window: the only routine that opens the inventory gate for a
//! player on purpose.

use std::sync::Arc;

use inventory_types::{ActorRef, ItemKind};
use tracing::{debug, warn};

use crate::error::KernelError;
use crate::lock::LockToggleService;
use crate::traits::{AdvancementOutcome, AdvancementWorkflow, NoticeLevel, Notifier};

/// Experience required to reach each level, indexed by current total level.
///
/// `thresholds[n]` is the xp needed to advance from total level `n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XpThresholds {
    thresholds: Vec<u64>,
}

impl XpThresholds {
    pub fn new(thresholds: Vec<u64>) -> Self {
        Self { thresholds }
    }

    /// The fifth-edition character advancement table.
    pub fn fifth_edition() -> Self {
        Self::new(vec![
            0, 300, 900, 2_700, 6_500, 14_000, 23_000, 34_000, 48_000, 64_000, 85_000, 100_000,
            120_000, 140_000, 165_000, 195_000, 225_000, 265_000, 305_000, 355_000,
        ])
    }

    /// Whether a character with `xp` (missing counts as 0) and
    /// `total_levels` across its classes may level up. Levels past the end of
    /// the table never can.
    pub fn is_ready(&self, xp: Option<u64>, total_levels: u32) -> bool {
        let xp = xp.unwrap_or(0);
        match self.thresholds.get(total_levels as usize) {
            Some(needed) => xp >= *needed,
            None => false,
        }
    }
}

impl Default for XpThresholds {
    fn default() -> Self {
        Self::fifth_edition()
    }
}

pub struct LevelUpSession {
    locks: Arc<LockToggleService>,
    workflow: Arc<dyn AdvancementWorkflow>,
    notifier: Arc<dyn Notifier>,
}

impl LevelUpSession {
    pub fn new(
        locks: Arc<LockToggleService>,
        workflow: Arc<dyn AdvancementWorkflow>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            locks,
            workflow,
            notifier,
        }
    }

    /// Unlock, run the external advancement flow, then lock again.
    ///
    /// The gate is closed again whatever the workflow returns. A failure to
    /// re-lock wins over a workflow failure: an inventory left open is the
    /// worse state.
    pub async fn run(&self, actor: &ActorRef) -> Result<AdvancementOutcome, KernelError> {
        debug!(actor = %actor.name, "Level-up requested");
        self.locks.unlock(actor).await?;

        let outcome = self.workflow.advance(actor).await;

        self.locks.lock(actor).await?;

        match outcome {
            Ok(AdvancementOutcome::NoClassItem) => {
                self.notifier
                    .notify(NoticeLevel::Warn, "Character has no class item.");
                Ok(AdvancementOutcome::NoClassItem)
            }
            Ok(AdvancementOutcome::Advanced { class, level }) => {
                self.notifier.notify(
                    NoticeLevel::Info,
                    &format!("Level increased: {class} {level}"),
                );
                Ok(AdvancementOutcome::Advanced { class, level })
            }
            Err(source) => {
                warn!(actor = %actor.id, error = %source, "Advancement workflow failed");
                Err(KernelError::Advancement {
                    actor: actor.id.clone(),
                    reason: source.to_string(),
                })
            }
        }
    }

    /// Browsing for a class, race or background item opens the gate so the
    /// chosen item can be dropped onto the sheet. Returns whether it did.
    pub async fn on_item_browse(
        &self,
        actor: &ActorRef,
        kind: ItemKind,
    ) -> Result<bool, KernelError> {
        if !matches!(kind, ItemKind::Class | ItemKind::Race | ItemKind::Background) {
            return Ok(false);
        }
        self.locks.unlock(actor).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::memory::{InMemoryHost, ScriptedAdvancement};
    use inventory_types::{Actor, LockFlag};

    fn session(
        workflow: ScriptedAdvancement,
    ) -> (LevelUpSession, Arc<LockToggleService>, Arc<InMemoryHost>, ActorRef) {
        let host = Arc::new(InMemoryHost::new());
        let actor = Actor::new("hero", "Aria").with_lock(LockFlag::Locked);
        let reference = actor.reference();
        host.insert_actor(actor);
        let locks = Arc::new(LockToggleService::new(host.clone(), host.clone()));
        let session = LevelUpSession::new(locks.clone(), Arc::new(workflow), host.clone());
        (session, locks, host, reference)
    }

    #[test]
    fn readiness_follows_table() {
        let table = XpThresholds::fifth_edition();
        assert!(table.is_ready(Some(300), 1));
        assert!(!table.is_ready(Some(299), 1));
        assert!(table.is_ready(None, 0));
        assert!(!table.is_ready(None, 1));
        assert!(!table.is_ready(Some(u64::MAX), 20));
    }

    #[tokio::test]
    async fn run_relocks_after_advancing() {
        let (session, locks, host, actor) = session(ScriptedAdvancement::advanced("Wizard", 3));
        let outcome = session.run(&actor).await.unwrap();

        assert_eq!(
            outcome,
            AdvancementOutcome::Advanced {
                class: "Wizard".into(),
                level: 3
            }
        );
        assert_eq!(locks.state(&actor).await.unwrap(), LockFlag::Locked);
        assert_eq!(
            host.notices_at(NoticeLevel::Info),
            vec![
                "Aria: inventoryLocked = false".to_string(),
                "Aria: inventoryLocked = true".to_string(),
                "Level increased: Wizard 3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn run_relocks_when_workflow_fails() {
        let (session, locks, _, actor) = session(ScriptedAdvancement::failing(
            HostError::Unavailable("advancement manager crashed".into()),
        ));
        let err = session.run(&actor).await.unwrap_err();

        assert!(matches!(err, KernelError::Advancement { .. }));
        assert_eq!(locks.state(&actor).await.unwrap(), LockFlag::Locked);
    }

    #[tokio::test]
    async fn no_class_item_warns() {
        let (session, _, host, actor) = session(ScriptedAdvancement::no_class());
        session.run(&actor).await.unwrap();
        assert_eq!(
            host.notices_at(NoticeLevel::Warn),
            vec!["Character has no class item.".to_string()]
        );
    }

    #[tokio::test]
    async fn browsing_character_options_unlocks() {
        let (session, locks, _, actor) = session(ScriptedAdvancement::no_class());

        assert!(!session.on_item_browse(&actor, ItemKind::Weapon).await.unwrap());
        assert_eq!(locks.state(&actor).await.unwrap(), LockFlag::Locked);

        assert!(session.on_item_browse(&actor, ItemKind::Race).await.unwrap());
        assert_eq!(locks.state(&actor).await.unwrap(), LockFlag::Unlocked);
    }
}
