//! Initialization and materialization behavior.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tabgroup_core::{LoadStrategy, TabGroup, TabGroupConfig, TabGroupEvent};
use tabgroup_test_utils::{broken, drain, scripted, scripted_with_surface, setup_group, Call, Journal, Surface};

fn config(strategy: LoadStrategy) -> TabGroupConfig {
    TabGroupConfig::new().with_load_strategy(strategy)
}

/// The first enabled tab is selected and loaded.
#[tokio::test]
async fn first_enabled_tab_is_selected_and_loaded() {
    let journal = Journal::new();
    let (a, _) = scripted("intro", &journal);
    let (b, _) = scripted("customer", &journal);
    let (c, _) = scripted("loan", &journal);

    let group = setup_group(
        config(LoadStrategy::OnClickOnly),
        vec![a.with_enabled(false), b, c],
    )
    .await;

    assert_eq!(group.selected_index(), Some(1));
    assert!(group.status(1).unwrap().loaded);
    assert!(!group.status(0).unwrap().loaded);
    assert!(!group.status(2).unwrap().loaded);
    assert_eq!(journal.creates(), vec!["customer".to_string()]);
}

/// Eager groups load every enabled tab in order; disabled tabs never load.
#[tokio::test]
async fn eager_loads_every_enabled_tab() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, _) = scripted("b", &journal);
    let (c, _) = scripted("c", &journal);
    let (d, _) = scripted("d", &journal);

    let group = setup_group(
        config(LoadStrategy::Eager),
        vec![a, b.with_enabled(false), c, d],
    )
    .await;

    let loaded: Vec<bool> = (0..4).map(|i| group.status(i).unwrap().loaded).collect();
    assert_eq!(loaded, vec![true, false, true, true]);
    assert_eq!(journal.creates(), vec!["a", "c", "d"]);
    assert_eq!(group.selected_index(), Some(0));
}

/// Lazy groups defer non-on-click tabs to settle and skip on-click tabs.
#[tokio::test]
async fn lazy_defers_and_skips_on_click_tabs() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);
    let (b, _) = scripted("b", &journal);
    let (c, _) = scripted("c", &journal);
    let (d, _) = scripted("d", &journal);

    let mut group = setup_group(
        config(LoadStrategy::Lazy),
        vec![
            a,
            b.with_mode(LoadStrategy::OnClickOnly),
            c.with_mode(LoadStrategy::Eager),
            d,
        ],
    )
    .await;

    assert_eq!(journal.creates(), vec!["a"]);
    assert_eq!(group.pending_background(), 2);

    assert_eq!(group.settle().await, 2);

    let loaded: Vec<bool> = (0..4).map(|i| group.status(i).unwrap().loaded).collect();
    assert_eq!(loaded, vec![true, false, true, true]);
    assert_eq!(group.pending_background(), 0);
}

/// Seeds and read-only flags are applied before the tab counts as loaded.
#[tokio::test]
async fn seed_and_read_only_applied_on_materialize() {
    let journal = Journal::new();
    let (review, handle) = scripted("review", &journal);
    let seed = json!({ "amount": 25000 });

    let _group = setup_group(
        config(LoadStrategy::Eager),
        vec![review.with_seed(seed.clone()).with_read_only(true)],
    )
    .await;

    assert_eq!(handle.seed(), Some(seed));
    assert!(handle.is_read_only());
    assert_eq!(
        journal.calls(),
        vec![
            Call::Create("review".into()),
            Call::Seed("review".into()),
            Call::ReadOnly("review".into(), true),
        ]
    );
}

/// Materialization waits for the rendering surface instead of failing.
#[tokio::test(start_paused = true)]
async fn waits_for_surface_before_creating() {
    let journal = Journal::new();
    let (a, _) = scripted_with_surface("a", &journal, Surface::AfterPolls(3));

    let group = setup_group(
        config(LoadStrategy::Eager).with_surface_retry(Duration::from_millis(20)),
        vec![a],
    )
    .await;

    assert!(group.status(0).unwrap().loaded);
    assert_eq!(journal.creates(), vec!["a"]);
}

/// Initial state mirrors the live body.
#[tokio::test]
async fn initial_status_mirrors_body() {
    let journal = Journal::new();
    let (a, handle) = scripted("a", &journal);
    handle.set_valid_silently(false);
    handle.set_dirty(true);

    let group = setup_group(config(LoadStrategy::Eager), vec![a]).await;

    let status = group.status(0).unwrap();
    assert!(!status.valid);
    assert!(status.dirty);
}

/// A failing factory records the error and leaves the tab unloaded.
#[tokio::test]
async fn load_failure_is_recorded() {
    let journal = Journal::new();
    let (b, _) = scripted("b", &journal);
    let mut group = TabGroup::new(config(LoadStrategy::Eager));
    let mut events = group.subscribe();

    group.set_tabs(vec![broken("a"), b]).await.unwrap();

    let status = group.status(0).unwrap();
    assert!(!status.loaded);
    assert!(status.error.unwrap().contains("no view for a"));
    assert!(group.status(1).unwrap().loaded);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        TabGroupEvent::LoadFailed { index: 0, .. }
    )));
    assert!(events.contains(&TabGroupEvent::SelectionChanged {
        previous: None,
        current: 0
    }));
}

/// Replacing the descriptor list re-initializes everything.
#[tokio::test]
async fn replacing_tabs_reinitializes() {
    let journal = Journal::new();
    let (a, handle_a) = scripted("a", &journal);
    let (b, _) = scripted("b", &journal);
    let mut group = setup_group(config(LoadStrategy::Eager), vec![a.clone(), b.clone()]).await;

    handle_a.set_dirty(true);
    group.select(1).await.unwrap();
    assert_eq!(group.selected_index(), Some(0));

    handle_a.set_dirty(false);
    group
        .set_tabs(vec![a, b.with_enabled(false).with_disabled_tooltip("Save first")])
        .await
        .unwrap();

    assert_eq!(group.selected_index(), Some(0));
    assert!(!group.status(1).unwrap().loaded);
    assert_eq!(journal.creates(), vec!["a", "b", "a"]);
}

/// A group with no enabled tabs selects nothing and loads nothing.
#[tokio::test]
async fn all_disabled_selects_nothing() {
    let journal = Journal::new();
    let (a, _) = scripted("a", &journal);

    let group = setup_group(config(LoadStrategy::Eager), vec![a.with_enabled(false)]).await;

    assert_eq!(group.selected_index(), None);
    assert!(!group.has_any_loaded());
    assert!(journal.creates().is_empty());
}
