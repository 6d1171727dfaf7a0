//! Core type definitions for the inventory integrity kernel.
//!
//! This crate provides the shared data model only. No business logic, just
//! types: actors and their tri-state inventory lock, items and containers,
//! sparse item updates, mutation requests, and the derived container load band.

pub mod actor;
pub mod ids;
pub mod item;
pub mod load;
pub mod mutation;

// Re-export primary types at crate root for ergonomic use.
pub use actor::{Actor, ActorRef, LockFlag};
pub use ids::{ActorId, ItemId, UserId};
pub use item::{Capacity, Item, ItemField, ItemKind, ItemSpec, ItemUpdate};
pub use load::{ContainerLoad, LoadState, DEFAULT_BULGE_MARGIN};
pub use mutation::{
    CommitEvent, MutationKind, MutationOrigin, MutationRequest, ProposedMutation, Requester,
};
