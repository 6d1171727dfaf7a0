//! Scenario replay against the in-memory host

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use inventory_kernel::{
    AdvancementOutcome, BreakOutcome, ChatMessage, GuardDecision, HostBindings, HostError,
    InMemoryHost, InventoryKernel, ItemStore, KernelConfig, LoadTransition, NoticeLevel,
    ScanDisposition, ScanReport, ScriptedAdvancement,
};
use inventory_types::{
    Actor, ActorId, ActorRef, Item, ItemId, ItemKind, ItemUpdate, LockFlag, MutationOrigin,
    ProposedMutation, UserId,
};
use serde::{Deserialize, Serialize};

/// A replayable scenario file.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Users resolved as referees
    #[serde(default)]
    pub privileged_users: Vec<String>,
    pub actors: Vec<ActorFixture>,
    /// Result the level-up workflow reports
    #[serde(default)]
    pub advancement: AdvancementFixture,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct ActorFixture {
    pub id: String,
    pub name: String,
    /// Persisted lock flag; absent means never set
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub items: Vec<ItemFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFixture {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub contents_weight: Option<f64>,
    #[serde(default)]
    pub container: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvancementFixture {
    Advanced {
        class: String,
        level: u32,
    },
    #[default]
    NoClassItem,
    Failing {
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Run the guard; when allowed, apply the mutation and fire the commit hook
    Propose {
        actor: String,
        user: String,
        #[serde(default = "default_origin")]
        origin: MutationOrigin,
        mutation: ProposedMutation,
    },
    /// Apply an update directly and fire the commit hook
    Commit {
        actor: String,
        item: String,
        user: String,
        changes: ItemUpdate,
    },
    Lock {
        actor: String,
    },
    Unlock {
        actor: String,
    },
    LevelUp {
        actor: String,
    },
    Browse {
        actor: String,
        kind: ItemKind,
    },
}

fn default_origin() -> MutationOrigin {
    MutationOrigin::Interaction
}

/// Serializable view of a [`ScanReport`].
#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub scanned_at: DateTime<Utc>,
    pub disposition: ScanDisposition,
    pub evaluated: usize,
    pub transitions: Vec<LoadTransition>,
    pub breaks: Vec<BreakOutcome>,
    pub failures: Vec<String>,
}

impl From<ScanReport> for ScanSummary {
    fn from(report: ScanReport) -> Self {
        Self {
            scanned_at: report.scanned_at,
            disposition: report.disposition,
            evaluated: report.evaluated,
            transitions: report.transitions,
            breaks: report.breaks,
            failures: report.failures.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// One JSON line of replay output.
#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepRecord {
    Propose {
        actor: ActorId,
        decision: GuardDecision,
        #[serde(skip_serializing_if = "Option::is_none")]
        scan: Option<ScanSummary>,
    },
    Commit {
        actor: ActorId,
        scan: ScanSummary,
    },
    Lock {
        actor: ActorId,
        locked: bool,
    },
    LevelUp {
        actor: ActorId,
        outcome: AdvancementOutcome,
    },
    Browse {
        actor: ActorId,
        kind: ItemKind,
        unlocked: bool,
    },
    Finished {
        notices: Vec<(NoticeLevel, String)>,
        chat: Vec<ChatMessage>,
        actors: Vec<Actor>,
    },
}

impl ActorFixture {
    fn into_actor(self) -> Actor {
        let id = ActorId::from(self.id);
        let mut actor = Actor::new(id.clone(), self.name).with_lock(LockFlag::from_stored(self.locked));
        for fixture in self.items {
            let mut item = Item::new(id.clone(), fixture.name, fixture.kind).with_id(fixture.id);
            item.quantity = fixture.quantity;
            item.weight = fixture.weight;
            item.contents_weight = fixture.contents_weight;
            if let Some(capacity) = fixture.capacity {
                item = item.with_capacity(capacity);
            }
            if let Some(container) = fixture.container {
                item = item.stored_in(ItemId::from(container));
            }
            actor.insert_item(item);
        }
        actor
    }
}

impl AdvancementFixture {
    fn into_workflow(self) -> ScriptedAdvancement {
        match self {
            AdvancementFixture::Advanced { class, level } => {
                ScriptedAdvancement::advanced(class, level)
            }
            AdvancementFixture::NoClassItem => ScriptedAdvancement::no_class(),
            AdvancementFixture::Failing { reason } => {
                ScriptedAdvancement::failing(HostError::Unavailable(reason))
            }
        }
    }
}

pub fn parse(json: &str) -> Result<Scenario> {
    serde_json::from_str(json).context("invalid scenario file")
}

struct Replayer {
    host: Arc<InMemoryHost>,
    kernel: InventoryKernel,
}

impl Replayer {
    async fn actor_ref(&self, id: &str) -> Result<ActorRef> {
        let actor = self
            .host
            .actor(&ActorId::from(id))
            .await
            .with_context(|| format!("unknown actor '{id}'"))?;
        Ok(actor.reference())
    }

    async fn step(&self, step: Step) -> Result<StepRecord> {
        let record = match step {
            Step::Propose {
                actor,
                user,
                origin,
                mutation,
            } => {
                let actor = self.actor_ref(&actor).await?;
                let user = UserId::from(user.as_str());
                let decision = self
                    .kernel
                    .on_propose(&actor, &user, origin, mutation.clone())
                    .await?;
                let scan = if decision.is_allow() {
                    self.apply(&actor.id, &user, mutation).await?
                } else {
                    None
                };
                StepRecord::Propose {
                    actor: actor.id,
                    decision,
                    scan,
                }
            }
            Step::Commit {
                actor,
                item,
                user,
                changes,
            } => {
                let actor = ActorId::from(actor);
                let item = ItemId::from(item);
                self.host.apply_update(&actor, &item, &changes)?;
                let report = self
                    .kernel
                    .on_commit(&actor, &item, changes, &UserId::from(user.as_str()))
                    .await?;
                StepRecord::Commit {
                    actor,
                    scan: report.into(),
                }
            }
            Step::Lock { actor } => {
                let actor = self.actor_ref(&actor).await?;
                self.kernel.lock(&actor).await?;
                StepRecord::Lock {
                    actor: actor.id,
                    locked: true,
                }
            }
            Step::Unlock { actor } => {
                let actor = self.actor_ref(&actor).await?;
                self.kernel.unlock(&actor).await?;
                StepRecord::Lock {
                    actor: actor.id,
                    locked: false,
                }
            }
            Step::LevelUp { actor } => {
                let actor = self.actor_ref(&actor).await?;
                let outcome = self.kernel.level_up(&actor).await?;
                StepRecord::LevelUp {
                    actor: actor.id,
                    outcome,
                }
            }
            Step::Browse { actor, kind } => {
                let actor = self.actor_ref(&actor).await?;
                let unlocked = self.kernel.on_item_browse(&actor, kind).await?;
                StepRecord::Browse {
                    actor: actor.id,
                    kind,
                    unlocked,
                }
            }
        };
        Ok(record)
    }

    /// Apply an allowed mutation the way the host would. Only updates fire
    /// the commit hook.
    async fn apply(
        &self,
        actor: &ActorId,
        user: &UserId,
        mutation: ProposedMutation,
    ) -> Result<Option<ScanSummary>> {
        match mutation {
            ProposedMutation::Update { item, changes } => {
                self.host.apply_update(actor, &item, &changes)?;
                let report = self.kernel.on_commit(actor, &item, changes, user).await?;
                Ok(Some(report.into()))
            }
            ProposedMutation::Create { spec } => {
                self.host.create_items(actor, vec![spec]).await?;
                Ok(None)
            }
            ProposedMutation::Delete { item } => {
                self.host.delete_item(actor, &item).await?;
                Ok(None)
            }
        }
    }
}

/// Replay every step, writing one JSON record per line, then a final
/// record with the accumulated notices, chat and actor state.
pub async fn run(scenario: Scenario, config: KernelConfig, out: &mut impl Write) -> Result<()> {
    let host = Arc::new(InMemoryHost::new());
    for user in &scenario.privileged_users {
        host.grant_privilege(user.as_str());
    }
    let mut actor_ids = Vec::new();
    for fixture in scenario.actors {
        let actor = fixture.into_actor();
        actor_ids.push(actor.id.clone());
        host.insert_actor(actor);
    }

    let bindings = HostBindings::from_host(
        host.clone(),
        Arc::new(scenario.advancement.into_workflow()),
    );
    let replayer = Replayer {
        host: host.clone(),
        kernel: InventoryKernel::new(config, bindings),
    };

    for (index, step) in scenario.steps.into_iter().enumerate() {
        let record = replayer
            .step(step)
            .await
            .with_context(|| format!("step {index} failed"))?;
        writeln!(out, "{}", serde_json::to_string(&record)?)?;
    }

    let finished = StepRecord::Finished {
        notices: host.notices(),
        chat: host.chat_log(),
        actors: actor_ids
            .iter()
            .filter_map(|id| host.snapshot(id))
            .collect(),
    };
    writeln!(out, "{}", serde_json::to_string(&finished)?)?;
    Ok(())
}
