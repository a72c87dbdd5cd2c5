//! Save-All protocol: auto-load, ordered validation, parent and internal saves.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tabgroup_core::{
    AutoLoadPolicy, BlockReason, LoadStrategy, SaveAllOutcome, SaveBlock, SaveMode, SavePhase,
    TabContext, TabContract, TabData, TabDescriptor, TabError, TabFactory, TabGroupConfig,
    TabGroupError, TabGroupEvent,
};
use tabgroup_test_utils::{
    broken, drain, progress_of, scripted, scripted_with_surface, setup_group, Journal, Surface,
};

fn parent() -> TabGroupConfig {
    TabGroupConfig::new()
        .with_load_strategy(LoadStrategy::Eager)
        .with_save_mode(SaveMode::Parent)
}

fn internal() -> TabGroupConfig {
    TabGroupConfig::new()
        .with_load_strategy(LoadStrategy::Eager)
        .with_save_mode(SaveMode::Internal)
}

/// Parent mode aggregates included tabs by id and saves nothing itself.
#[tokio::test]
async fn parent_mode_aggregates_included_tabs() {
    let journal = Journal::new();
    let (a, handle_a) = scripted("customer", &journal);
    let (b, handle_b) = scripted("loan", &journal);
    let (c, handle_c) = scripted("notes", &journal);
    handle_a.set_data(json!({ "name": "Ada" }));
    handle_b.set_data(json!({ "amount": 25000, "term": 36 }));
    handle_c.set_data(json!({ "text": "internal" }));

    let mut group = setup_group(parent(), vec![a, b, c.with_global_payload(false)]).await;
    let mut events = group.subscribe();

    let outcome = group.save_all().await.unwrap();

    let SaveAllOutcome::Aggregated(payload) = outcome else {
        panic!("expected aggregate, got {outcome:?}");
    };
    assert_eq!(payload.ids().collect::<Vec<_>>(), vec!["customer", "loan"]);
    assert_eq!(payload.get("customer"), Some(&json!({ "name": "Ada" })));
    assert_eq!(payload.get("loan"), Some(&json!({ "amount": 25000, "term": 36 })));
    assert!(journal.saves().is_empty());

    let events = drain(&mut events);
    let delivered: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TabGroupEvent::Payload { payload, .. } => Some(payload.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(delivered, vec![payload]);

    let phases: Vec<SavePhase> = progress_of(&events).iter().map(|p| p.phase).collect();
    assert_eq!(
        phases,
        vec![SavePhase::Autoload, SavePhase::Validate, SavePhase::Emit, SavePhase::Complete]
    );
}

/// The first invalid tab in descriptor order wins, and nothing is saved.
#[tokio::test]
async fn first_invalid_tab_is_selected() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, handle_b) = scripted("b", &journal);
    let (c, handle_c) = scripted("c", &journal);

    for config in [parent(), internal()] {
        let mut group = setup_group(config, vec![a.clone(), b.clone(), c.clone()]).await;
        let mut events = group.subscribe();
        handle_b.set_valid(false);
        handle_c.set_valid(false);

        let outcome = group.save_all().await.unwrap();

        assert_eq!(
            outcome,
            SaveAllOutcome::Blocked(SaveBlock {
                index: 1,
                id: "b".into(),
                reason: BlockReason::Invalid,
            })
        );
        assert_eq!(group.selected_index(), Some(1));
        assert!(journal.saves().is_empty());
        assert!(!drain(&mut events)
            .iter()
            .any(|e| matches!(e, TabGroupEvent::Payload { .. })));

        handle_b.set_valid(true);
        handle_c.set_valid(true);
    }
}

/// Internal mode saves in order and stops at the first rejection.
#[tokio::test]
async fn internal_save_stops_at_failure() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, handle_b) = scripted("b", &journal);
    let (c, _) = scripted("c", &journal);
    handle_b.fail_saves("backend rejected");

    let mut group = setup_group(internal(), vec![a, b, c]).await;
    let mut events = group.subscribe();

    let err = group.save_all().await.unwrap_err();

    assert!(matches!(
        err,
        TabGroupError::SaveFailed { index: 1, ref id, .. } if id == "b"
    ));
    assert_eq!(journal.saves(), vec!["a", "b"]);

    let progress = progress_of(&drain(&mut events));
    let last = progress.last().unwrap();
    assert_eq!(last.phase, SavePhase::Error);
    assert_eq!(last.failed_phase, Some(SavePhase::Saving));
    assert_eq!(last.current_tab_id.as_deref(), Some("b"));
    assert!(last.error.as_deref().unwrap().contains("backend rejected"));
}

/// Internal mode skips read-only tabs and clears dirty flags of saved tabs.
#[tokio::test]
async fn internal_save_skips_read_only() {
    let journal = Journal::new();
    let (a, handle_a) = scripted("a", &journal);
    let (review, handle_review) = scripted("review", &journal);
    let (c, _) = scripted("c", &journal);

    let mut group = setup_group(internal(), vec![a, review.with_read_only(true), c]).await;
    let mut events = group.subscribe();
    handle_a.set_dirty(true);
    handle_review.set_valid(false);

    let outcome = group.save_all().await.unwrap();

    assert_eq!(outcome, SaveAllOutcome::Saved(vec!["a".into(), "c".into()]));
    assert_eq!(journal.saves(), vec!["a", "c"]);
    assert!(!group.status(0).unwrap().dirty);

    let saving: Vec<Option<usize>> = progress_of(&drain(&mut events))
        .iter()
        .filter(|p| p.phase == SavePhase::Saving)
        .map(|p| p.current_tab_index)
        .collect();
    assert_eq!(saving, vec![Some(0), Some(2)]);
}

/// Unloaded tabs are auto-loaded first, with running counts.
#[tokio::test]
async fn auto_loads_missing_tabs() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, _) = scripted("b", &journal);
    let (c, _) = scripted("c", &journal);
    let (d, _) = scripted("d", &journal);

    let mut group = setup_group(
        TabGroupConfig::new()
            .with_load_strategy(LoadStrategy::OnClickOnly)
            .with_save_mode(SaveMode::Parent),
        vec![a, b, c.with_enabled(false), d],
    )
    .await;
    let mut events = group.subscribe();

    let outcome = group.save_all().await.unwrap();

    assert!(outcome.is_success());
    assert!(group.status(1).unwrap().loaded);
    assert!(!group.status(2).unwrap().loaded);
    assert!(group.status(3).unwrap().loaded);

    let counts: Vec<(Option<usize>, Option<usize>)> = progress_of(&drain(&mut events))
        .iter()
        .filter(|p| p.phase == SavePhase::Autoload)
        .map(|p| (p.total_to_load, p.loaded_count))
        .collect();
    assert_eq!(
        counts,
        vec![(Some(2), Some(0)), (Some(2), Some(1)), (Some(2), Some(2))]
    );
}

/// A tab that never materializes aborts Save-All without an aggregate.
#[tokio::test(start_paused = true)]
async fn auto_load_timeout_aborts() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, _) = scripted_with_surface("b", &journal, Surface::Never);
    let (c, _) = scripted("c", &journal);

    let mut group = setup_group(
        TabGroupConfig::new()
            .with_save_mode(SaveMode::Parent)
            .with_auto_load_timeout(Duration::from_millis(50)),
        vec![a, b.with_mode(LoadStrategy::OnClickOnly), c],
    )
    .await;
    group.settle().await;
    let mut events = group.subscribe();

    let err = group.save_all().await.unwrap_err();

    assert!(matches!(
        err,
        TabGroupError::LoadTimeout { index: 1, timeout_ms: 50, .. }
    ));
    assert_eq!(group.selected_index(), Some(1));
    assert!(!group.status(1).unwrap().loaded);
    assert!(group.status(1).unwrap().error.is_some());

    let events = drain(&mut events);
    assert!(!events.iter().any(|e| matches!(e, TabGroupEvent::Payload { .. })));
    let last = progress_of(&events).pop().unwrap();
    assert_eq!(last.phase, SavePhase::Error);
    assert_eq!(last.failed_phase, Some(SavePhase::Autoload));
    assert_eq!(last.current_tab_index, Some(1));
}

/// A view that cannot be built aborts the save before any payload.
#[tokio::test]
async fn auto_load_factory_error_aborts() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (c, _) = scripted("c", &journal);

    let mut group = setup_group(
        TabGroupConfig::new().with_save_mode(SaveMode::Parent),
        vec![a, broken("b").with_mode(LoadStrategy::OnClickOnly), c],
    )
    .await;
    group.settle().await;
    let mut events = group.subscribe();

    let err = group.save_all().await.unwrap_err();

    let TabGroupError::LoadFailed { index, id, source } = err else {
        panic!("expected a load failure");
    };
    assert_eq!((index, id.as_str()), (1, "b"));
    assert!(source.to_string().contains("no view for b"));
    assert_eq!(group.selected_index(), Some(1));
    assert!(group.status(1).unwrap().error.is_some());

    let events = drain(&mut events);
    assert!(!events.iter().any(|e| matches!(e, TabGroupEvent::Payload { .. })));
    let last = progress_of(&events).pop().unwrap();
    assert_eq!(last.phase, SavePhase::Error);
    assert_eq!(last.failed_phase, Some(SavePhase::Autoload));
    assert_eq!(last.current_tab_index, Some(1));
}

/// After a failure, selection lands on the earliest target still unloaded.
#[tokio::test(start_paused = true)]
async fn auto_load_failure_selects_first_unloaded_target() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, _) = scripted_with_surface("b", &journal, Surface::Never);

    let mut group = setup_group(
        TabGroupConfig::new()
            .with_save_mode(SaveMode::Parent)
            .with_auto_load_concurrency(2)
            .with_auto_load_timeout(Duration::from_secs(60)),
        vec![
            a,
            b.with_mode(LoadStrategy::OnClickOnly),
            broken("c").with_mode(LoadStrategy::OnClickOnly),
        ],
    )
    .await;
    group.settle().await;

    let err = group.save_all().await.unwrap_err();

    assert!(matches!(err, TabGroupError::LoadFailed { index: 2, .. }));
    assert_eq!(group.selected_index(), Some(1));
    assert!(!group.status(1).unwrap().loaded);
    assert!(!group.status(1).unwrap().loading);
    assert!(group.status(2).unwrap().error.is_some());
}

/// Without auto-load, an unloaded editable tab stops the save.
#[tokio::test]
async fn no_auto_load_blocks_on_unloaded_tab() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, _) = scripted("b", &journal);

    let mut group = setup_group(
        TabGroupConfig::new()
            .with_load_strategy(LoadStrategy::OnClickOnly)
            .with_auto_load(AutoLoadPolicy::None),
        vec![a, b],
    )
    .await;

    let outcome = group.save_all().await.unwrap();

    assert_eq!(
        outcome,
        SaveAllOutcome::Blocked(SaveBlock {
            index: 1,
            id: "b".into(),
            reason: BlockReason::NotLoaded,
        })
    );
    assert_eq!(group.selected_index(), Some(1));
    assert!(journal.saves().is_empty());
}

/// Progress can be switched off; the aggregate is still delivered.
#[tokio::test]
async fn progress_can_be_silenced() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let mut group = setup_group(parent().with_emit_progress(false), vec![a]).await;
    let mut events = group.subscribe();

    group.save_all().await.unwrap();

    let events = drain(&mut events);
    assert!(progress_of(&events).is_empty());
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TabGroupEvent::Payload { .. }));
}

struct Idle;

#[async_trait::async_trait]
impl TabContract for Idle {
    fn is_valid(&self) -> bool {
        true
    }
    fn is_dirty(&self) -> bool {
        false
    }
    async fn save(&mut self) -> Result<(), TabError> {
        Ok(())
    }
    fn reset(&mut self) {}
    fn data(&self) -> TabData {
        TabData::Null
    }
}

/// Tracks how many tabs wait on their surface at once.
#[derive(Default)]
struct CountingFactory {
    waiting: Mutex<HashSet<usize>>,
    polls: Mutex<Vec<usize>>,
    peak: AtomicUsize,
}

impl TabFactory for CountingFactory {
    fn surface_ready(&self, ctx: &TabContext) -> bool {
        let mut waiting = self.waiting.lock();
        waiting.insert(ctx.index);
        self.peak.fetch_max(waiting.len(), Ordering::SeqCst);

        let mut polls = self.polls.lock();
        if polls.len() <= ctx.index {
            polls.resize(ctx.index + 1, 0);
        }
        polls[ctx.index] += 1;
        polls[ctx.index] > 3
    }

    fn create(&self, ctx: TabContext) -> Result<Box<dyn TabContract>, TabError> {
        self.waiting.lock().remove(&ctx.index);
        Ok(Box::new(Idle))
    }
}

/// Auto-load keeps at most `auto_load_concurrency` tabs in flight.
#[tokio::test(start_paused = true)]
async fn auto_load_concurrency_is_bounded() {
    let factory = Arc::new(CountingFactory::default());
    let tabs: Vec<TabDescriptor> = (0..6)
        .map(|i| TabDescriptor::new(format!("t{i}"), format!("T{i}"), factory.clone()))
        .collect();

    let mut group = setup_group(
        TabGroupConfig::new()
            .with_load_strategy(LoadStrategy::OnClickOnly)
            .with_auto_load_concurrency(2),
        tabs,
    )
    .await;
    factory.peak.store(0, Ordering::SeqCst);

    let outcome = group.save_all().await.unwrap();

    assert!(outcome.is_success());
    assert!((0..6).all(|i| group.status(i).unwrap().loaded));
    assert_eq!(factory.peak.load(Ordering::SeqCst), 2);
}
