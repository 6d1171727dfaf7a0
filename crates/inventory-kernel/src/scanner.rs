use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use inventory_types::{ActorId, CommitEvent, Item, ItemId, LoadState};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::breaker::{BreakOutcome, ContainerBreakHandler, EffectStatus};
use crate::config::{OverloadConfig, ScanTrigger};
use crate::error::{BreakError, ScanError};
use crate::traits::{ChatChannel, ChatMessage, ItemStore};

/// Chat line warning that a container is close to capacity.
pub fn bulge_notice(container_name: &str) -> String {
    format!(
        "<b style=\"color:yellow\">{container_name}</b> is starting to bulge at the seams! <b>BULGING</b>!"
    )
}

/// How a commit was handled by the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDisposition {
    /// Containers were evaluated and effects fired
    Scanned,
    /// Non-privileged commit: logged, nothing evaluated
    ObservedOnly,
    /// Commit did not touch a field the configured trigger cares about
    NotTriggered,
}

/// A container entering a new load band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadTransition {
    pub container: ItemId,
    pub name: String,
    pub from: LoadState,
    pub to: LoadState,
    /// Contents over capacity at the crossing, `None` without capacity
    pub ratio: Option<f64>,
    /// Chat notice status for bulging entries, `None` for bursts
    pub notice: Option<EffectStatus>,
}

/// Everything one scan did.
#[derive(Debug)]
pub struct ScanReport {
    pub actor: ActorId,
    pub scanned_at: DateTime<Utc>,
    pub disposition: ScanDisposition,
    pub evaluated: usize,
    pub transitions: Vec<LoadTransition>,
    pub breaks: Vec<BreakOutcome>,
    /// Break failures; other containers were still scanned
    pub failures: Vec<BreakError>,
}

impl ScanReport {
    fn empty(actor: ActorId, disposition: ScanDisposition) -> Self {
        Self {
            actor,
            scanned_at: Utc::now(),
            disposition,
            evaluated: 0,
            transitions: Vec::new(),
            breaks: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Post-commit monitor of container loads.
///
/// Keeps the last observed [`LoadState`] of every container it has scanned.
/// Swapping that latch is the crossing test, so effects fire once per
/// crossing even when scans for the same actor interleave.
pub struct OverloadScanner {
    config: OverloadConfig,
    items: Arc<dyn ItemStore>,
    chat: Arc<dyn ChatChannel>,
    breaker: Arc<ContainerBreakHandler>,
    latch: DashMap<ItemId, (ActorId, LoadState)>,
}

impl OverloadScanner {
    pub fn new(
        config: OverloadConfig,
        items: Arc<dyn ItemStore>,
        chat: Arc<dyn ChatChannel>,
        breaker: Arc<ContainerBreakHandler>,
    ) -> Self {
        Self {
            config,
            items,
            chat,
            breaker,
            latch: DashMap::new(),
        }
    }

    /// Last latched state of a container, `None` if never scanned.
    pub fn latched_state(&self, container: &ItemId) -> Option<LoadState> {
        self.latch.get(container).map(|entry| entry.value().1)
    }

    /// Commit-hook entry point.
    pub async fn on_committed(&self, event: &CommitEvent) -> Result<ScanReport, ScanError> {
        debug!(
            actor = %event.actor,
            item = %event.item,
            fields = ?event.changes.touched_fields(),
            privileged = event.requester.privileged,
            "Item update committed"
        );

        if !event.requester.privileged {
            return Ok(ScanReport::empty(
                event.actor.clone(),
                ScanDisposition::ObservedOnly,
            ));
        }

        if self.config.scan_trigger == ScanTrigger::WeightRelevant
            && !event
                .changes
                .touched_fields()
                .iter()
                .any(|f| f.is_weight_relevant())
        {
            return Ok(ScanReport::empty(
                event.actor.clone(),
                ScanDisposition::NotTriggered,
            ));
        }

        self.scan(&event.actor).await
    }

    /// Evaluate every container on the actor and fire crossing effects.
    pub async fn scan(&self, actor_id: &ActorId) -> Result<ScanReport, ScanError> {
        let actor = self
            .items
            .actor(actor_id)
            .await
            .map_err(|source| ScanError::ActorUnavailable {
                actor: actor_id.clone(),
                source,
            })?;
        let actor_ref = actor.reference();

        let mut report = ScanReport::empty(actor_id.clone(), ScanDisposition::Scanned);
        let mut present = BTreeSet::new();

        let containers: Vec<Item> = actor.containers().cloned().collect();
        for container in containers {
            let Some(load) = container.container_load() else {
                continue;
            };
            present.insert(container.id.clone());
            report.evaluated += 1;

            let state = load.state(self.config.bulge_margin);
            let previous = self
                .latch
                .insert(container.id.clone(), (actor_id.clone(), state))
                .map(|(_, s)| s)
                .unwrap_or_default();

            debug!(
                container = %container.name,
                capacity = load.capacity,
                contents = load.contents,
                state = %state,
                previous = %previous,
                "Checking container"
            );

            match state {
                LoadState::Bulging if previous != LoadState::Bulging => {
                    let notice = self.announce_bulge(&actor_ref.name, &container).await;
                    report.transitions.push(LoadTransition {
                        container: container.id.clone(),
                        name: container.name.clone(),
                        from: previous,
                        to: state,
                        ratio: load.ratio(),
                        notice: Some(notice),
                    });
                }
                LoadState::Burst => {
                    let crossed = previous != LoadState::Burst;
                    if crossed {
                        report.transitions.push(LoadTransition {
                            container: container.id.clone(),
                            name: container.name.clone(),
                            from: previous,
                            to: state,
                            ratio: load.ratio(),
                            notice: None,
                        });
                    }
                    if crossed || self.breaker.has_pending(&container.id) {
                        match self.breaker.break_container(&actor_ref, &container).await {
                            Ok(outcome) => report.breaks.push(outcome),
                            Err(err) => {
                                if !err.is_state_corrupting() {
                                    // nothing ran, let the next scan cross again
                                    self.latch.remove(&container.id);
                                }
                                report.failures.push(err);
                            }
                        }
                    }
                }
                _ => {}
            }

            if state != LoadState::Burst {
                self.breaker.forget(&container.id);
            }
        }

        self.latch.retain(|id, (owner, _)| {
            let keep = owner != actor_id || present.contains(id);
            if !keep {
                self.breaker.forget(id);
            }
            keep
        });

        Ok(report)
    }

    async fn announce_bulge(&self, speaker: &str, container: &Item) -> EffectStatus {
        let message = ChatMessage {
            speaker: speaker.to_string(),
            html: bulge_notice(&container.name),
        };
        match self.chat.broadcast(message).await {
            Ok(()) => EffectStatus::Done,
            Err(err) => {
                warn!(container = %container.id, error = %err, "Failed to post bulge notice");
                EffectStatus::Failed(err.to_string())
            }
        }
    }
}
