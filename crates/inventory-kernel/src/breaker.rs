use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use inventory_types::{ActorRef, Item, ItemId, ItemKind, ItemSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::OverloadConfig;
use crate::error::{BreakError, HostError};
use crate::traits::{AudioChannel, ChatChannel, ChatMessage, ItemStore};

/// Chat line announcing that a container burst.
pub fn burst_announcement(container_name: &str) -> String {
    format!("<b style=\"color:red\">{container_name}</b> is overloaded and <b>BURSTS OPEN</b>!")
}

/// Result of a non-essential side effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum EffectStatus {
    Done,
    /// Failed, logged and swallowed
    Failed(String),
    /// Not attempted, already performed by an earlier attempt
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakStatus {
    /// Full sequence ran
    Completed,
    /// Finished the steps left over by an earlier failed attempt
    Resumed,
    /// Another break of the same container is running
    AlreadyInFlight,
    /// The container was already gone when the break started
    Vanished,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakOutcome {
    pub container: ItemId,
    pub status: BreakStatus,
    pub announcement: EffectStatus,
    pub sound: EffectStatus,
    pub remnant: Option<Item>,
}

/// What an interrupted break already did.
#[derive(Clone, Debug, Default)]
struct BreakProgress {
    announced: bool,
    remnant: Option<Item>,
}

/// Marks a container as being broken; released on drop.
struct InFlight<'a> {
    set: &'a DashSet<ItemId>,
    id: ItemId,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a DashSet<ItemId>, id: &ItemId) -> Option<Self> {
        set.insert(id.clone()).then(|| Self {
            set,
            id: id.clone(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

/// Replaces a burst container with a broken remnant.
///
/// Sequence, each step awaited before the next:
/// 1. announce in chat (failure logged, sequence continues)
/// 2. play the break sound (failure logged, sequence continues)
/// 3. create the remnant loot item on the same actor
/// 4. delete the container; the host moves its contents to the actor root
///
/// A failure in 3 or 4 is returned as [`BreakError`] and the progress is
/// kept, so the next attempt for the same container resumes at the failed
/// step without announcing twice or creating a second remnant.
pub struct ContainerBreakHandler {
    config: OverloadConfig,
    items: Arc<dyn ItemStore>,
    chat: Arc<dyn ChatChannel>,
    audio: Arc<dyn AudioChannel>,
    in_flight: DashSet<ItemId>,
    progress: DashMap<ItemId, BreakProgress>,
}

impl ContainerBreakHandler {
    pub fn new(
        config: OverloadConfig,
        items: Arc<dyn ItemStore>,
        chat: Arc<dyn ChatChannel>,
        audio: Arc<dyn AudioChannel>,
    ) -> Self {
        Self {
            config,
            items,
            chat,
            audio,
            in_flight: DashSet::new(),
            progress: DashMap::new(),
        }
    }

    /// Whether an earlier break of this container stopped part way.
    pub fn has_pending(&self, container: &ItemId) -> bool {
        self.progress.contains_key(container)
    }

    /// Drop any partial-break record for `container`. Called once the
    /// container has left the burst band or no longer exists, so a later
    /// burst starts a fresh break.
    pub fn forget(&self, container: &ItemId) {
        if self.progress.remove(container).is_some() {
            debug!(container = %container, "Discarded partial break record");
        }
    }

    /// Remnant spec for `container`.
    pub fn remnant_spec(&self, container: &Item) -> ItemSpec {
        ItemSpec {
            name: format!("{}{}", container.name, self.config.broken_suffix),
            kind: ItemKind::Loot,
            img: container.img.clone(),
            description: Some(self.config.broken_description.clone()),
            quantity: None,
            weight: container.weight,
        }
    }

    pub async fn break_container(
        &self,
        actor: &ActorRef,
        container: &Item,
    ) -> Result<BreakOutcome, BreakError> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight, &container.id) else {
            debug!(container = %container.id, "Break already in flight, skipping");
            return Ok(BreakOutcome {
                container: container.id.clone(),
                status: BreakStatus::AlreadyInFlight,
                announcement: EffectStatus::Skipped,
                sound: EffectStatus::Skipped,
                remnant: None,
            });
        };

        // The caller's snapshot may predate another break of this container.
        let current = self
            .items
            .actor(&actor.id)
            .await
            .map_err(|source| BreakError::ContainerLookup {
                container: container.id.clone(),
                source,
            })?;
        let Some(container) = current.item(&container.id) else {
            debug!(container = %container.id, "Container already gone, nothing to break");
            self.forget(&container.id);
            return Ok(BreakOutcome {
                container: container.id.clone(),
                status: BreakStatus::Vanished,
                announcement: EffectStatus::Skipped,
                sound: EffectStatus::Skipped,
                remnant: None,
            });
        };

        let mut progress = self
            .progress
            .get(&container.id)
            .map(|p| p.value().clone())
            .unwrap_or_default();
        let resumed = progress.announced;

        let (announcement, sound) = if progress.announced {
            (EffectStatus::Skipped, EffectStatus::Skipped)
        } else {
            info!(actor = %actor.id, container = %container.name, "Breaking container");
            let announcement = self.announce(actor, container).await;
            progress.announced = true;
            self.progress.insert(container.id.clone(), progress.clone());
            let sound = self.play_break_sound(container).await;
            (announcement, sound)
        };

        let remnant = match progress.remnant.clone() {
            Some(remnant) => remnant,
            None => {
                let remnant = self.create_remnant(actor, container).await?;
                progress.remnant = Some(remnant.clone());
                self.progress.insert(container.id.clone(), progress.clone());
                remnant
            }
        };

        if let Err(source) = self.items.delete_item(&actor.id, &container.id).await {
            error!(
                container = %container.id,
                remnant = %remnant.id,
                error = %source,
                "Container survived its own break, remnant already created"
            );
            return Err(BreakError::ContainerDeletion {
                container: container.id.clone(),
                remnant: remnant.id.clone(),
                source,
            });
        }

        self.progress.remove(&container.id);
        info!(
            actor = %actor.id,
            container = %container.id,
            remnant = %remnant.name,
            "Container replaced by broken remnant"
        );

        Ok(BreakOutcome {
            container: container.id.clone(),
            status: if resumed {
                BreakStatus::Resumed
            } else {
                BreakStatus::Completed
            },
            announcement,
            sound,
            remnant: Some(remnant),
        })
    }

    async fn announce(&self, actor: &ActorRef, container: &Item) -> EffectStatus {
        let message = ChatMessage {
            speaker: actor.name.clone(),
            html: burst_announcement(&container.name),
        };
        match self.chat.broadcast(message).await {
            Ok(()) => EffectStatus::Done,
            Err(err) => {
                warn!(container = %container.id, error = %err, "Failed to announce container break");
                EffectStatus::Failed(err.to_string())
            }
        }
    }

    async fn play_break_sound(&self, container: &Item) -> EffectStatus {
        match self.audio.play(&self.config.break_sound).await {
            Ok(()) => EffectStatus::Done,
            Err(err) => {
                warn!(container = %container.id, error = %err, "Failed to play break sound");
                EffectStatus::Failed(err.to_string())
            }
        }
    }

    async fn create_remnant(&self, actor: &ActorRef, container: &Item) -> Result<Item, BreakError> {
        let spec = self.remnant_spec(container);
        let created = self
            .items
            .create_items(&actor.id, vec![spec])
            .await
            .and_then(|items| {
                items
                    .into_iter()
                    .next()
                    .ok_or_else(|| HostError::Rejected("host created no remnant item".into()))
            });

        created.map_err(|source| {
            error!(
                container = %container.id,
                error = %source,
                "Broken remnant could not be created after break was announced"
            );
            BreakError::RemnantCreation {
                container: container.id.clone(),
                source,
            }
        })
    }
}
