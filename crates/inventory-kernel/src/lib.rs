//! Inventory integrity kernel for shared tabletop simulations.
//!
//! Two cooperating concerns sit between players and their characters'
//! item collections:
//!
//! - **Mutation guard**: while an actor's inventory is locked, players cannot
//!   edit quantities or add items by hand. Referees are never blocked, and
//!   an explicit unlock (the level-up window) lets everything through.
//! - **Overload monitor**: after every referee-applied update, containers
//!   are classified Normal / Bulging / Burst. Entering the bulging band posts
//!   a warning; bursting replaces the container with a broken remnant and
//!   spills its contents into the actor's root inventory.
//!
//! The host (storage, chat, audio, privilege lookup, editors) is reached
//! only through the traits in [`traits`]; [`memory::InMemoryHost`] provides
//! all of them for tests and offline replay.

pub mod advancement;
pub mod breaker;
pub mod config;
pub mod error;
pub mod guard;
pub mod kernel;
pub mod lock;
pub mod memory;
pub mod scanner;
pub mod telemetry;
pub mod traits;

pub use advancement::{LevelUpSession, XpThresholds};
pub use breaker::{
    burst_announcement, BreakOutcome, BreakStatus, ContainerBreakHandler, EffectStatus,
};
pub use config::{DeletePolicy, GuardConfig, KernelConfig, LoggingConfig, OverloadConfig, ScanTrigger};
pub use error::{BreakError, HostError, KernelError, LockError, ScanError};
pub use guard::{
    AllowReason, DenialReason, GuardDecision, MutationGuard, MANUAL_CREATE_DENIED,
    MANUAL_DELETE_DENIED, QUANTITY_EDIT_DENIED,
};
pub use kernel::{HostBindings, InventoryKernel};
pub use lock::LockToggleService;
pub use memory::{InMemoryHost, ScriptedAdvancement};
pub use scanner::{bulge_notice, LoadTransition, OverloadScanner, ScanDisposition, ScanReport};
pub use telemetry::init_tracing;
pub use traits::{
    AdvancementOutcome, AdvancementWorkflow, AudioChannel, ChatChannel, ChatMessage,
    EditorSurface, ItemStore, LockFlagStore, NoticeLevel, Notifier, PrivilegeOracle,
};
