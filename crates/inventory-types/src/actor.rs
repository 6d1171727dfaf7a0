use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, ItemId};
use crate::item::Item;

/// Persisted `inventoryLocked` flag of an actor.
///
/// Tri-state: a flag that was never written is distinct from an explicit
/// `false`. Only `Locked` closes the gate, and only `Unlocked` short-circuits it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockFlag {
    #[default]
    Unset,
    Unlocked,
    Locked,
}

impl LockFlag {
    pub fn from_stored(value: Option<bool>) -> Self {
        match value {
            None => LockFlag::Unset,
            Some(false) => LockFlag::Unlocked,
            Some(true) => LockFlag::Locked,
        }
    }

    pub fn to_stored(self) -> Option<bool> {
        match self {
            LockFlag::Unset => None,
            LockFlag::Unlocked => Some(false),
            LockFlag::Locked => Some(true),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockFlag::Locked)
    }

    /// True only for a flag explicitly written as `false`.
    pub fn is_explicitly_unlocked(&self) -> bool {
        matches!(self, LockFlag::Unlocked)
    }
}

impl std::fmt::Display for LockFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_stored() {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "unset"),
        }
    }
}

/// Lightweight handle naming an actor, for notices and chat speaker labels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: ActorId,
    pub name: String,
}

impl ActorRef {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An entity that exclusively owns a collection of items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default, rename = "inventoryLocked")]
    pub lock: LockFlag,
    #[serde(default)]
    pub items: BTreeMap<ItemId, Item>,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lock: LockFlag::Unset,
            items: BTreeMap::new(),
        }
    }

    pub fn with_lock(mut self, lock: LockFlag) -> Self {
        self.lock = lock;
        self
    }

    /// Add an item, rewriting its back-reference to this actor.
    pub fn with_item(mut self, item: Item) -> Self {
        self.insert_item(item);
        self
    }

    pub fn insert_item(&mut self, mut item: Item) {
        item.actor_id = self.id.clone();
        self.items.insert(item.id.clone(), item);
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Items that carry both capacity and contents weight.
    pub fn containers(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|i| i.container_load().is_some())
    }

    pub fn reference(&self) -> ActorRef {
        ActorRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn lock_flag_round_trips_stored_form() {
        for flag in [LockFlag::Unset, LockFlag::Unlocked, LockFlag::Locked] {
            assert_eq!(LockFlag::from_stored(flag.to_stored()), flag);
        }
    }

    #[test]
    fn only_explicit_false_is_unlocked() {
        assert!(LockFlag::Unlocked.is_explicitly_unlocked());
        assert!(!LockFlag::Unset.is_explicitly_unlocked());
        assert!(!LockFlag::Unset.is_locked());
        assert!(LockFlag::Locked.is_locked());
    }

    #[test]
    fn inserted_items_point_back_at_owner() {
        let stray = Item::new(ActorId::from("someone-else"), "Rope", ItemKind::Loot);
        let id = stray.id.clone();
        let actor = Actor::new("hero", "Aria").with_item(stray);
        assert_eq!(actor.item(&id).unwrap().actor_id, ActorId::from("hero"));
    }

    #[test]
    fn containers_skip_plain_items() {
        let actor = Actor::new("hero", "Aria")
            .with_item(Item::new(ActorId::from("hero"), "Rope", ItemKind::Loot).with_quantity(1))
            .with_item(
                Item::new(ActorId::from("hero"), "Backpack", ItemKind::Container)
                    .with_capacity(30.0)
                    .with_contents_weight(4.0),
            );
        let names: Vec<_> = actor.containers().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Backpack"]);
    }

    #[test]
    fn missing_lock_field_deserializes_as_unset() {
        let actor: Actor = serde_json::from_str(r#"{"id": "a", "name": "Aria"}"#).unwrap();
        assert_eq!(actor.lock, LockFlag::Unset);
    }
}
