use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, ItemId};
use crate::load::ContainerLoad;

/// Item category as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Loot,
    Container,
    Equipment,
    Consumable,
    Weapon,
    Tool,
    Class,
    Race,
    Background,
    #[serde(other)]
    Other,
}

/// Capacity block of a container item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    /// Maximum total contents weight
    pub weight: Option<f64>,
}

/// A possession record owned by exactly one actor.
///
/// `actor_id` is a back-reference only; the owning [`crate::Actor`] holds the item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub actor_id: ActorId,
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub capacity: Option<Capacity>,
    /// Live aggregate weight of everything stored inside, computed by the host
    #[serde(default)]
    pub contents_weight: Option<f64>,
    /// Container this item is stored in, `None` for the actor's root inventory
    #[serde(default)]
    pub container: Option<ItemId>,
}

impl Item {
    pub fn new(actor_id: ActorId, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(),
            actor_id,
            name: name.into(),
            kind,
            img: None,
            description: None,
            quantity: None,
            weight: None,
            capacity: None,
            contents_weight: None,
            container: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_img(mut self, img: impl Into<String>) -> Self {
        self.img = Some(img.into());
        self
    }

    pub fn with_capacity(mut self, weight: f64) -> Self {
        self.capacity = Some(Capacity { weight: Some(weight) });
        self
    }

    pub fn with_contents_weight(mut self, weight: f64) -> Self {
        self.contents_weight = Some(weight);
        self
    }

    pub fn stored_in(mut self, container: ItemId) -> Self {
        self.container = Some(container);
        self
    }

    /// Load figures for this item, if it carries both a capacity weight and a
    /// contents weight. Anything else is exempt from overload scanning.
    pub fn container_load(&self) -> Option<ContainerLoad> {
        let capacity = self.capacity.as_ref()?.weight?;
        let contents = self.contents_weight?;
        Some(ContainerLoad { capacity, contents })
    }
}

/// Field of an item that a proposed update can touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    Name,
    Img,
    Description,
    Quantity,
    Weight,
    CapacityWeight,
    ContentsWeight,
}

impl ItemField {
    /// Host document path of the field.
    pub fn path(&self) -> &'static str {
        match self {
            ItemField::Name => "name",
            ItemField::Img => "img",
            ItemField::Description => "system.description.value",
            ItemField::Quantity => "system.quantity",
            ItemField::Weight => "system.weight.value",
            ItemField::CapacityWeight => "system.capacity.weight.value",
            ItemField::ContentsWeight => "system.contentsWeight",
        }
    }

    /// Whether a change to this field can move a container's load.
    pub fn is_weight_relevant(&self) -> bool {
        matches!(
            self,
            ItemField::Quantity
                | ItemField::Weight
                | ItemField::CapacityWeight
                | ItemField::ContentsWeight
        )
    }
}

impl std::fmt::Display for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Sparse diff applied to an item. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents_weight: Option<f64>,
}

impl ItemUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn capacity_weight(mut self, weight: f64) -> Self {
        self.capacity_weight = Some(weight);
        self
    }

    pub fn contents_weight(mut self, weight: f64) -> Self {
        self.contents_weight = Some(weight);
        self
    }

    /// The set of fields this update changes.
    pub fn touched_fields(&self) -> BTreeSet<ItemField> {
        let mut fields = BTreeSet::new();
        if self.name.is_some() {
            fields.insert(ItemField::Name);
        }
        if self.img.is_some() {
            fields.insert(ItemField::Img);
        }
        if self.description.is_some() {
            fields.insert(ItemField::Description);
        }
        if self.quantity.is_some() {
            fields.insert(ItemField::Quantity);
        }
        if self.weight.is_some() {
            fields.insert(ItemField::Weight);
        }
        if self.capacity_weight.is_some() {
            fields.insert(ItemField::CapacityWeight);
        }
        if self.contents_weight.is_some() {
            fields.insert(ItemField::ContentsWeight);
        }
        fields
    }

    pub fn touches(&self, field: ItemField) -> bool {
        self.touched_fields().contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }

    /// Write every present field into `item`.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(img) = &self.img {
            item.img = Some(img.clone());
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(quantity) = self.quantity {
            item.quantity = Some(quantity);
        }
        if let Some(weight) = self.weight {
            item.weight = Some(weight);
        }
        if let Some(capacity) = self.capacity_weight {
            item.capacity.get_or_insert_with(Capacity::default).weight = Some(capacity);
        }
        if let Some(contents) = self.contents_weight {
            item.contents_weight = Some(contents);
        }
    }
}

/// Data for an item that does not exist yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl ItemSpec {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            img: None,
            description: None,
            quantity: None,
            weight: None,
        }
    }

    /// Materialise the spec as an item owned by `actor_id`.
    pub fn into_item(self, id: ItemId, actor_id: ActorId) -> Item {
        Item {
            id,
            actor_id,
            name: self.name,
            kind: self.kind,
            img: self.img,
            description: self.description,
            quantity: self.quantity,
            weight: self.weight,
            capacity: None,
            contents_weight: None,
            container: None,
        }
    }
}
