//! In-memory host used by tests and the replay CLI.
//!
//! Implements every host seam over a single mutex-protected world and
//! records the side effects (notices, chat, audio, editor re-renders) so
//! callers can assert on them. Failures can be injected per channel.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use inventory_types::{
    Actor, ActorId, ActorRef, Item, ItemId, ItemSpec, ItemUpdate, LockFlag, UserId,
};

use crate::error::HostError;
use crate::traits::{
    AdvancementOutcome, AdvancementWorkflow, AudioChannel, ChatChannel, ChatMessage,
    EditorSurface, ItemStore, LockFlagStore, NoticeLevel, Notifier, PrivilegeOracle,
};

#[derive(Default)]
struct Failures {
    audio: Option<HostError>,
    chat: Option<HostError>,
    creates: Option<HostError>,
    deletes: Option<HostError>,
    flag_writes: Option<HostError>,
}

#[derive(Default)]
struct World {
    actors: BTreeMap<ActorId, Actor>,
    privileged: BTreeSet<UserId>,
    notices: Vec<(NoticeLevel, String)>,
    rerendered: Vec<ItemId>,
    chat: Vec<ChatMessage>,
    sounds: Vec<String>,
    failures: Failures,
}

#[derive(Default)]
pub struct InMemoryHost {
    world: Mutex<World>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_actor(&self, actor: Actor) {
        self.world().actors.insert(actor.id.clone(), actor);
    }

    /// Add an item to the actor named by its `actor_id`. Unknown actors are
    /// ignored.
    pub fn insert_item(&self, item: Item) {
        if let Some(actor) = self.world().actors.get_mut(&item.actor_id) {
            actor.insert_item(item);
        }
    }

    pub fn snapshot(&self, actor: &ActorId) -> Option<Actor> {
        self.world().actors.get(actor).cloned()
    }

    /// Write an update straight into the world, as the host does once a
    /// mutation has been allowed.
    pub fn apply_update(
        &self,
        actor: &ActorId,
        item: &ItemId,
        changes: &ItemUpdate,
    ) -> Result<Item, HostError> {
        let mut world = self.world();
        let actor = world
            .actors
            .get_mut(actor)
            .ok_or_else(|| HostError::ActorNotFound(actor.clone()))?;
        let target = actor
            .items
            .get_mut(item)
            .ok_or_else(|| HostError::ItemNotFound(item.clone()))?;
        changes.apply_to(target);
        Ok(target.clone())
    }

    pub fn grant_privilege(&self, user: impl Into<UserId>) {
        self.world().privileged.insert(user.into());
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.world().notices.clone()
    }

    pub fn notices_at(&self, level: NoticeLevel) -> Vec<String> {
        self.world()
            .notices
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn rerendered(&self) -> Vec<ItemId> {
        self.world().rerendered.clone()
    }

    pub fn chat_log(&self) -> Vec<ChatMessage> {
        self.world().chat.clone()
    }

    pub fn sounds_played(&self) -> Vec<String> {
        self.world().sounds.clone()
    }

    pub fn fail_audio(&self, error: HostError) {
        self.world().failures.audio = Some(error);
    }

    pub fn fail_chat(&self, error: HostError) {
        self.world().failures.chat = Some(error);
    }

    pub fn fail_creates(&self, error: HostError) {
        self.world().failures.creates = Some(error);
    }

    pub fn fail_deletes(&self, error: HostError) {
        self.world().failures.deletes = Some(error);
    }

    pub fn fail_flag_writes(&self, error: HostError) {
        self.world().failures.flag_writes = Some(error);
    }

    pub fn clear_failures(&self) {
        self.world().failures = Failures::default();
    }
}

impl PrivilegeOracle for InMemoryHost {
    fn is_privileged(&self, user: &UserId) -> bool {
        self.world().privileged.contains(user)
    }
}

impl Notifier for InMemoryHost {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.world().notices.push((level, message.to_string()));
    }
}

impl EditorSurface for InMemoryHost {
    fn rerender(&self, item: &ItemId) {
        self.world().rerendered.push(item.clone());
    }
}

// Every async call yields first so concurrent callers interleave the way
// they would against a real host.

#[async_trait]
impl ChatChannel for InMemoryHost {
    async fn broadcast(&self, message: ChatMessage) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        let mut world = self.world();
        if let Some(err) = world.failures.chat.clone() {
            return Err(err);
        }
        world.chat.push(message);
        Ok(())
    }
}

#[async_trait]
impl AudioChannel for InMemoryHost {
    async fn play(&self, path: &str) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        let mut world = self.world();
        if let Some(err) = world.failures.audio.clone() {
            return Err(err);
        }
        world.sounds.push(path.to_string());
        Ok(())
    }
}

#[async_trait]
impl ItemStore for InMemoryHost {
    async fn actor(&self, id: &ActorId) -> Result<Actor, HostError> {
        tokio::task::yield_now().await;
        self.snapshot(id)
            .ok_or_else(|| HostError::ActorNotFound(id.clone()))
    }

    async fn create_items(
        &self,
        actor: &ActorId,
        specs: Vec<ItemSpec>,
    ) -> Result<Vec<Item>, HostError> {
        tokio::task::yield_now().await;
        let mut world = self.world();
        if let Some(err) = world.failures.creates.clone() {
            return Err(err);
        }
        let owner = world
            .actors
            .get_mut(actor)
            .ok_or_else(|| HostError::ActorNotFound(actor.clone()))?;

        let created: Vec<Item> = specs
            .into_iter()
            .map(|spec| spec.into_item(ItemId::new(), actor.clone()))
            .collect();
        for item in &created {
            owner.insert_item(item.clone());
        }
        Ok(created)
    }

    async fn delete_item(&self, actor: &ActorId, item: &ItemId) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        let mut world = self.world();
        if let Some(err) = world.failures.deletes.clone() {
            return Err(err);
        }
        let owner = world
            .actors
            .get_mut(actor)
            .ok_or_else(|| HostError::ActorNotFound(actor.clone()))?;
        owner
            .items
            .remove(item)
            .ok_or_else(|| HostError::ItemNotFound(item.clone()))?;

        for stored in owner.items.values_mut() {
            if stored.container.as_ref() == Some(item) {
                stored.container = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LockFlagStore for InMemoryHost {
    async fn lock_flag(&self, actor: &ActorId) -> Result<LockFlag, HostError> {
        tokio::task::yield_now().await;
        self.world()
            .actors
            .get(actor)
            .map(|a| a.lock)
            .ok_or_else(|| HostError::ActorNotFound(actor.clone()))
    }

    async fn set_lock_flag(&self, actor: &ActorId, locked: bool) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        let mut world = self.world();
        if let Some(err) = world.failures.flag_writes.clone() {
            return Err(err);
        }
        let owner = world
            .actors
            .get_mut(actor)
            .ok_or_else(|| HostError::ActorNotFound(actor.clone()))?;
        owner.lock = LockFlag::from_stored(Some(locked));
        Ok(())
    }
}

/// Advancement workflow that returns a fixed result.
pub struct ScriptedAdvancement {
    result: Result<AdvancementOutcome, HostError>,
}

impl ScriptedAdvancement {
    pub fn advanced(class: impl Into<String>, level: u32) -> Self {
        Self {
            result: Ok(AdvancementOutcome::Advanced {
                class: class.into(),
                level,
            }),
        }
    }

    pub fn no_class() -> Self {
        Self {
            result: Ok(AdvancementOutcome::NoClassItem),
        }
    }

    pub fn failing(error: HostError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl AdvancementWorkflow for ScriptedAdvancement {
    async fn advance(&self, _actor: &ActorRef) -> Result<AdvancementOutcome, HostError> {
        tokio::task::yield_now().await;
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_types::ItemKind;

    fn hero() -> ActorId {
        ActorId::from("hero")
    }

    fn host_with_pack() -> InMemoryHost {
        let host = InMemoryHost::new();
        host.insert_actor(
            Actor::new("hero", "Aria")
                .with_item(
                    Item::new(hero(), "Backpack", ItemKind::Container)
                        .with_id("pack")
                        .with_capacity(20.0),
                )
                .with_item(
                    Item::new(hero(), "Torch", ItemKind::Loot)
                        .with_id("torch")
                        .stored_in(ItemId::from("pack")),
                ),
        );
        host
    }

    #[tokio::test]
    async fn deleting_container_moves_contents_to_root() {
        let host = host_with_pack();
        host.delete_item(&hero(), &ItemId::from("pack")).await.unwrap();

        let actor = host.snapshot(&hero()).unwrap();
        assert!(actor.item(&ItemId::from("pack")).is_none());
        assert_eq!(actor.item(&ItemId::from("torch")).unwrap().container, None);
    }

    #[tokio::test]
    async fn deleting_missing_item_fails() {
        let host = host_with_pack();
        let err = host
            .delete_item(&hero(), &ItemId::from("nope"))
            .await
            .unwrap_err();
        assert_eq!(err, HostError::ItemNotFound(ItemId::from("nope")));
    }

    #[tokio::test]
    async fn created_items_belong_to_actor() {
        let host = host_with_pack();
        let created = host
            .create_items(&hero(), vec![ItemSpec::new("Shard", ItemKind::Loot)])
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].actor_id, hero());
        assert!(host.snapshot(&hero()).unwrap().item(&created[0].id).is_some());
    }

    #[tokio::test]
    async fn injected_failures_clear() {
        let host = host_with_pack();
        host.fail_audio(HostError::Unavailable("muted".into()));
        assert!(host.play("a.mp3").await.is_err());

        host.clear_failures();
        host.play("a.mp3").await.unwrap();
        assert_eq!(host.sounds_played(), vec!["a.mp3".to_string()]);
    }

    #[test]
    fn privilege_is_granted_per_user() {
        let host = InMemoryHost::new();
        host.grant_privilege("gm");
        assert!(host.is_privileged(&UserId::from("gm")));
        assert!(!host.is_privileged(&UserId::from("p1")));
    }
}
