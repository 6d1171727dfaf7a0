use std::sync::Arc;

use async_trait::async_trait;
use inventory_kernel::{
    burst_announcement, AudioChannel, BreakStatus, EffectStatus, HostBindings, HostError,
    InMemoryHost, InventoryKernel, KernelConfig, NoticeLevel, ScanDisposition,
    ScriptedAdvancement, QUANTITY_EDIT_DENIED,
};
use inventory_types::{
    Actor, ActorId, Item, ItemId, ItemKind, ItemUpdate, LockFlag, MutationOrigin,
    ProposedMutation, UserId,
};

fn actor_a() -> ActorId {
    ActorId::from("actor-a")
}

fn gm() -> UserId {
    UserId::from("gm")
}

fn player() -> UserId {
    UserId::from("player")
}

fn seed(host: &InMemoryHost) -> Actor {
    let actor = Actor::new(actor_a(), "Brannoc")
        .with_lock(LockFlag::Locked)
        .with_item(
            Item::new(actor_a(), "Chest", ItemKind::Container)
                .with_id("chest")
                .with_weight(25.0)
                .with_capacity(20.0)
                .with_contents_weight(8.0),
        )
        .with_item(
            Item::new(actor_a(), "Waterskin", ItemKind::Consumable)
                .with_id("waterskin")
                .with_quantity(3)
                .stored_in(ItemId::from("chest")),
        );
    host.insert_actor(actor.clone());
    host.grant_privilege("gm");
    actor
}

fn kernel_over(host: Arc<InMemoryHost>) -> InventoryKernel {
    let bindings =
        HostBindings::from_host(host, Arc::new(ScriptedAdvancement::advanced("Rogue", 4)));
    InventoryKernel::new(KernelConfig::default(), bindings)
}

/// Propose through the guard and apply to the host if allowed.
async fn sheet_update(
    kernel: &InventoryKernel,
    host: &InMemoryHost,
    actor: &Actor,
    user: &UserId,
    origin: MutationOrigin,
    item: &str,
    changes: ItemUpdate,
) -> bool {
    let decision = kernel
        .on_propose(
            &actor.reference(),
            user,
            origin,
            ProposedMutation::Update {
                item: ItemId::from(item),
                changes: changes.clone(),
            },
        )
        .await
        .unwrap();
    if decision.is_deny() {
        return false;
    }
    host.apply_update(&actor.id, &ItemId::from(item), &changes)
        .unwrap();
    kernel
        .on_commit(&actor.id, &ItemId::from(item), changes, user)
        .await
        .unwrap();
    true
}

#[tokio::test]
async fn locked_sheet_edit_denied_then_referee_overload_breaks_chest() {
    let host = Arc::new(InMemoryHost::new());
    let actor = seed(&host);
    let kernel = kernel_over(host.clone());

    let applied = sheet_update(
        &kernel,
        &host,
        &actor,
        &player(),
        MutationOrigin::Interaction,
        "waterskin",
        ItemUpdate::new().quantity(4),
    )
    .await;
    assert!(!applied);
    assert_eq!(
        host.notices_at(NoticeLevel::Error),
        vec![QUANTITY_EDIT_DENIED.to_string()]
    );
    let snapshot = host.snapshot(&actor_a()).unwrap();
    assert_eq!(
        snapshot.item(&ItemId::from("waterskin")).unwrap().quantity,
        Some(3)
    );

    let applied = sheet_update(
        &kernel,
        &host,
        &actor,
        &gm(),
        MutationOrigin::Programmatic,
        "chest",
        ItemUpdate::new().contents_weight(22.0),
    )
    .await;
    assert!(applied);

    let snapshot = host.snapshot(&actor_a()).unwrap();
    assert!(snapshot.item(&ItemId::from("chest")).is_none());
    let remnant = snapshot
        .items
        .values()
        .find(|i| i.name == "Chest (Broken)")
        .expect("remnant created");
    assert_eq!(remnant.kind, ItemKind::Loot);
    assert_eq!(remnant.weight, Some(25.0));
    assert_eq!(
        snapshot.item(&ItemId::from("waterskin")).unwrap().container,
        None
    );

    let chat = host.chat_log();
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].speaker, "Brannoc");
    assert_eq!(chat[0].html, burst_announcement("Chest"));
    assert_eq!(host.sounds_played(), vec!["sounds/glass-break.mp3".to_string()]);
}

#[tokio::test]
async fn player_commits_never_fire_effects() {
    let host = Arc::new(InMemoryHost::new());
    let actor = seed(&host);
    let kernel = kernel_over(host.clone());
    kernel.unlock(&actor.reference()).await.unwrap();

    // explicitly unlocked: the player may push the chest over capacity
    let applied = sheet_update(
        &kernel,
        &host,
        &actor,
        &player(),
        MutationOrigin::Interaction,
        "chest",
        ItemUpdate::new().contents_weight(40.0),
    )
    .await;
    assert!(applied);
    assert!(host.chat_log().is_empty());
    assert!(host
        .snapshot(&actor_a())
        .unwrap()
        .item(&ItemId::from("chest"))
        .is_some());

    let report = kernel
        .on_commit(
            &actor_a(),
            &ItemId::from("chest"),
            ItemUpdate::new().contents_weight(40.0),
            &player(),
        )
        .await
        .unwrap();
    assert_eq!(report.disposition, ScanDisposition::ObservedOnly);
}

struct RejectingAudio;

#[async_trait]
impl AudioChannel for RejectingAudio {
    async fn play(&self, _path: &str) -> Result<(), HostError> {
        Err(HostError::Rejected("autoplay blocked".into()))
    }
}

#[tokio::test]
async fn rejected_audio_does_not_stop_the_break() {
    let host = Arc::new(InMemoryHost::new());
    seed(&host);
    let mut bindings =
        HostBindings::from_host(host.clone(), Arc::new(ScriptedAdvancement::no_class()));
    bindings.audio = Arc::new(RejectingAudio);
    let kernel = InventoryKernel::new(KernelConfig::default(), bindings);

    host.apply_update(
        &actor_a(),
        &ItemId::from("chest"),
        &ItemUpdate::new().contents_weight(21.0),
    )
    .unwrap();
    let report = kernel
        .on_commit(
            &actor_a(),
            &ItemId::from("chest"),
            ItemUpdate::new().contents_weight(21.0),
            &gm(),
        )
        .await
        .unwrap();

    assert_eq!(report.breaks.len(), 1);
    let outcome = &report.breaks[0];
    assert_eq!(outcome.status, BreakStatus::Completed);
    assert_eq!(outcome.announcement, EffectStatus::Done);
    assert!(matches!(outcome.sound, EffectStatus::Failed(_)));
    assert!(host
        .snapshot(&actor_a())
        .unwrap()
        .item(&ItemId::from("chest"))
        .is_none());
    assert!(host.notices_at(NoticeLevel::Error).is_empty());
}

#[tokio::test]
async fn failed_delete_is_escalated_and_retried_without_duplicates() {
    let host = Arc::new(InMemoryHost::new());
    seed(&host);
    let kernel = kernel_over(host.clone());
    host.apply_update(
        &actor_a(),
        &ItemId::from("chest"),
        &ItemUpdate::new().contents_weight(30.0),
    )
    .unwrap();

    host.fail_deletes(HostError::Unavailable("storage timeout".into()));
    let first = kernel
        .on_commit(
            &actor_a(),
            &ItemId::from("chest"),
            ItemUpdate::new().contents_weight(30.0),
            &gm(),
        )
        .await
        .unwrap();
    assert_eq!(first.failures.len(), 1);
    assert_eq!(host.notices_at(NoticeLevel::Error).len(), 1);

    host.clear_failures();
    let retry = kernel
        .on_commit(
            &actor_a(),
            &ItemId::from("chest"),
            ItemUpdate::new().name("Old Chest"),
            &gm(),
        )
        .await
        .unwrap();
    assert!(retry.is_clean());
    assert_eq!(retry.breaks[0].status, BreakStatus::Resumed);

    let snapshot = host.snapshot(&actor_a()).unwrap();
    let remnants = snapshot
        .items
        .values()
        .filter(|i| i.name.ends_with("(Broken)"))
        .count();
    assert_eq!(remnants, 1);
    assert!(snapshot.item(&ItemId::from("chest")).is_none());
    assert_eq!(host.chat_log().len(), 1);
}

#[tokio::test]
async fn concurrent_commits_break_once() {
    let host = Arc::new(InMemoryHost::new());
    seed(&host);
    let kernel = kernel_over(host.clone());
    host.apply_update(
        &actor_a(),
        &ItemId::from("chest"),
        &ItemUpdate::new().contents_weight(50.0),
    )
    .unwrap();

    let (actor, chest, user) = (actor_a(), ItemId::from("chest"), gm());
    let commit = || {
        kernel.on_commit(
            &actor,
            &chest,
            ItemUpdate::new().contents_weight(50.0),
            &user,
        )
    };
    let (a, b) = tokio::join!(commit(), commit());
    let (a, b) = (a.unwrap(), b.unwrap());

    let completed = a
        .breaks
        .iter()
        .chain(b.breaks.iter())
        .filter(|o| o.status == BreakStatus::Completed)
        .count();
    assert_eq!(completed, 1);
    assert_eq!(host.chat_log().len(), 1);
    let remnants = host
        .snapshot(&actor_a())
        .unwrap()
        .items
        .values()
        .filter(|i| i.name == "Chest (Broken)")
        .count();
    assert_eq!(remnants, 1);
}

#[tokio::test]
async fn level_up_window_opens_and_closes() {
    let host = Arc::new(InMemoryHost::new());
    let actor = seed(&host);
    let kernel = kernel_over(host.clone());

    kernel.level_up(&actor.reference()).await.unwrap();

    assert_eq!(host.snapshot(&actor_a()).unwrap().lock, LockFlag::Locked);
    assert_eq!(
        host.notices_at(NoticeLevel::Info),
        vec![
            "Brannoc: inventoryLocked = false".to_string(),
            "Brannoc: inventoryLocked = true".to_string(),
            "Level increased: Rogue 4".to_string(),
        ]
    );

    let decision = kernel
        .on_propose(
            &actor.reference(),
            &player(),
            MutationOrigin::Interaction,
            ProposedMutation::Update {
                item: ItemId::from("waterskin"),
                changes: ItemUpdate::new().quantity(9),
            },
        )
        .await
        .unwrap();
    assert!(decision.is_deny());
}
