//! Tab group engine
//!
//! Owns the descriptor list, one [`TabRuntimeState`] per descriptor, and the
//! current selection. Drives:
//! - Initial materialization per load strategy
//! - Guarded tab switching and on-demand loading
//! - The Save-All protocol (auto-load, validate, save or aggregate, emit)
//! - Per-tab save/reset and capability queries
//!
//! All work runs cooperatively on the caller's task. The bounded auto-loader
//! interleaves up to `auto_load_concurrency` materializations without spawning.

use crate::config::{SaveMode, TabGroupConfig};
use crate::contract::{StatusNotifier, StatusSignal, TabContext, TabContract, TabFactory};
use crate::descriptor::{LoadStrategy, TabDescriptor};
use crate::error::{TabError, TabGroupError};
use crate::events::{RunId, SavePayload, SavePhase, SaveProgress, TabGroupEvent};
use crate::state::{TabRuntimeState, TabStatus};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Result of a tab switch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Selection moved to the requested tab
    Selected,
    /// Requested tab was already selected
    Unchanged,
    /// Current tab is dirty or invalid; selection kept
    Vetoed,
    /// On-click tab gated by the listed invalid tabs; nothing loaded
    Blocked { invalid: Vec<usize> },
    /// Requested tab is disabled
    Disabled,
    /// Requested tab failed to load; selection kept
    LoadFailed,
}

/// Result of an explicit load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    AlreadyLoaded,
    Disabled,
    Blocked { invalid: Vec<usize> },
    Failed(String),
}

/// Why Save-All stopped before saving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// A tab needed for the save is not loaded
    NotLoaded,
    /// A tab reported invalid
    Invalid,
}

/// First tab that stopped Save-All; it is selected for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveBlock {
    pub index: usize,
    pub id: String,
    pub reason: BlockReason,
}

/// Result of a Save-All call that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SaveAllOutcome {
    /// Parent mode: the aggregate delivered to the host
    Aggregated(SavePayload),
    /// Internal mode: ids of the tabs saved, in order
    Saved(Vec<String>),
    /// Validation stopped the save
    Blocked(SaveBlock),
}

impl SaveAllOutcome {
    /// Check if data was saved or delivered
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Blocked(_))
    }
}

/// The tab group orchestrator
pub struct TabGroup {
    config: TabGroupConfig,
    tabs: Vec<TabDescriptor>,
    states: Vec<TabRuntimeState>,
    selected: Option<usize>,
    /// Lazy loads deferred to [`settle`](Self::settle)
    background: VecDeque<usize>,
    /// Bumped on every re-initialization; stale notifications are dropped
    generation: u64,
    status_tx: mpsc::UnboundedSender<StatusSignal>,
    status_rx: mpsc::UnboundedReceiver<StatusSignal>,
    events: Option<mpsc::UnboundedSender<TabGroupEvent>>,
}

impl TabGroup {
    /// Create an empty group
    #[must_use]
    pub fn new(config: TabGroupConfig) -> Self {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            config,
            tabs: Vec::new(),
            states: Vec::new(),
            selected: None,
            background: VecDeque::new(),
            generation: 0,
            status_tx,
            status_rx,
            events: None,
        }
    }

    /// Create a group and initialize it with `tabs`
    ///
    /// # Errors
    /// See [`set_tabs`](Self::set_tabs).
    pub async fn with_tabs(
        config: TabGroupConfig,
        tabs: Vec<TabDescriptor>,
    ) -> Result<Self, TabGroupError> {
        let mut group = Self::new(config);
        group.set_tabs(tabs).await?;
        Ok(group)
    }

    /// Receive engine events; replaces any earlier subscriber
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TabGroupEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    /// Replace the descriptor list and re-initialize all state
    ///
    /// Previously loaded bodies are dropped. The first enabled tab is
    /// materialized and selected; with an eager strategy every enabled tab
    /// loads now, with a lazy strategy the remaining non-on-click tabs are
    /// queued for [`settle`](Self::settle).
    ///
    /// # Errors
    /// Returns `TabGroupError::InvalidDescriptors` for empty or duplicate ids.
    pub async fn set_tabs(&mut self, tabs: Vec<TabDescriptor>) -> Result<(), TabGroupError> {
        validate_descriptors(&tabs)?;

        self.generation += 1;
        while self.status_rx.try_recv().is_ok() {}
        self.states = tabs.iter().map(|_| TabRuntimeState::default()).collect();
        self.tabs = tabs;
        self.selected = None;
        self.background.clear();

        let Some(first) = self.tabs.iter().position(|t| t.enabled) else {
            tracing::info!(tabs = self.tabs.len(), "no enabled tabs; nothing selected");
            return Ok(());
        };

        let strategy = self.config.load_strategy;
        tracing::info!(
            tabs = self.tabs.len(),
            %strategy,
            generation = self.generation,
            "initializing tab group"
        );

        match strategy {
            LoadStrategy::Eager => {
                for index in self.enabled_indices() {
                    self.load_now(index).await;
                }
                self.set_selected(first);
            }
            LoadStrategy::Lazy | LoadStrategy::OnClickOnly => {
                self.load_now(first).await;
                self.set_selected(first);

                if strategy == LoadStrategy::Lazy {
                    let deferred: Vec<usize> = self
                        .enabled_indices()
                        .into_iter()
                        .filter(|&i| i != first && !self.effective_mode_of(i).is_on_click_only())
                        .collect();
                    tracing::debug!(count = deferred.len(), "queued background loads");
                    self.background.extend(deferred);
                }
            }
        }

        Ok(())
    }

    /// Run queued background loads
    ///
    /// Returns the number of tabs loaded.
    pub async fn settle(&mut self) -> usize {
        tokio::task::yield_now().await;

        let mut loaded = 0;
        while let Some(index) = self.background.pop_front() {
            if self.tabs[index].enabled && !self.states[index].loaded() && self.load_now(index).await {
                loaded += 1;
            }
        }
        loaded
    }

    /// Number of loads still waiting for [`settle`](Self::settle)
    #[inline]
    #[must_use]
    pub fn pending_background(&self) -> usize {
        self.background.len()
    }

    // ------------------------------------------------------------------
    // Status mirroring
    // ------------------------------------------------------------------

    /// Apply pending change notifications from tab bodies
    ///
    /// Returns the number of tabs whose mirrored state changed.
    pub fn sync_status(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(signal) = self.status_rx.try_recv() {
            if self.apply_signal(signal) {
                changed += 1;
            }
        }
        changed
    }

    /// Wait for the next change notification, then apply everything pending
    pub async fn changed(&mut self) -> usize {
        let mut changed = 0;
        if let Some(signal) = self.status_rx.recv().await {
            if self.apply_signal(signal) {
                changed += 1;
            }
        }
        changed + self.sync_status()
    }

    /// Re-read every loaded body, for bodies that cannot notify
    pub fn refresh_all(&mut self) -> usize {
        (0..self.states.len()).filter(|&i| self.refresh(i)).count()
    }

    fn apply_signal(&mut self, signal: StatusSignal) -> bool {
        if signal.generation != self.generation || signal.index >= self.states.len() {
            return false;
        }
        self.refresh(signal.index)
    }

    fn refresh(&mut self, index: usize) -> bool {
        let changed = self.states[index].refresh();
        if changed {
            self.emit_status(index);
        }
        changed
    }

    /// Mirror values the engine itself produced, emitting on change
    fn record_status(&mut self, index: usize, valid: bool, dirty: bool) -> bool {
        let changed = self.states[index].record(valid, dirty);
        if changed {
            self.emit_status(index);
        }
        changed
    }

    fn emit_status(&self, index: usize) {
        let state = &self.states[index];
        let (valid, dirty) = (state.valid, state.dirty);
        tracing::debug!(index, valid, dirty, "tab status changed");
        self.emit(TabGroupEvent::StatusChanged { index, valid, dirty });
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Request a switch to tab `next`
    ///
    /// Leaving a loaded, editable tab that is dirty or invalid is vetoed unless
    /// `next` is an on-click tab. An unloaded on-click tab with a validation
    /// gate is only loaded once every loaded editable tab is valid.
    ///
    /// # Errors
    /// Returns `TabGroupError::UnknownTab` for an out-of-range index.
    pub async fn select(&mut self, next: usize) -> Result<SwitchOutcome, TabGroupError> {
        self.check_index(next)?;
        self.sync_status();

        if !self.tabs[next].enabled {
            return Ok(SwitchOutcome::Disabled);
        }
        if self.selected == Some(next) {
            return Ok(SwitchOutcome::Unchanged);
        }

        let next_on_click = self.effective_mode_of(next).is_on_click_only();

        if let Some(current) = self.selected {
            self.refresh(current);
            if self.config.validate_on_tab_switch && self.holds_unfinished_work(current) && !next_on_click {
                tracing::debug!(from = current, to = next, "tab switch vetoed");
                self.emit(TabGroupEvent::SwitchVetoed { from: current, to: next });
                return Ok(SwitchOutcome::Vetoed);
            }
        }

        if !self.states[next].loaded() {
            if next_on_click {
                let invalid = self.load_gate(next);
                if !invalid.is_empty() {
                    tracing::debug!(index = next, ?invalid, "on-click load gated");
                    self.emit(TabGroupEvent::LoadBlocked {
                        index: next,
                        invalid: invalid.clone(),
                    });
                    return Ok(SwitchOutcome::Blocked { invalid });
                }
            }
            self.background.retain(|&i| i != next);
            if !self.load_now(next).await {
                return Ok(SwitchOutcome::LoadFailed);
            }
        }

        self.set_selected(next);
        Ok(SwitchOutcome::Selected)
    }

    /// Explicitly load a tab without selecting it
    ///
    /// # Errors
    /// Returns `TabGroupError::UnknownTab` for an out-of-range index.
    pub async fn load_tab(&mut self, index: usize) -> Result<LoadOutcome, TabGroupError> {
        self.check_index(index)?;
        self.sync_status();

        if !self.tabs[index].enabled {
            return Ok(LoadOutcome::Disabled);
        }
        if self.states[index].loaded() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if self.effective_mode_of(index).is_on_click_only() {
            let invalid = self.load_gate(index);
            if !invalid.is_empty() {
                self.emit(TabGroupEvent::LoadBlocked {
                    index,
                    invalid: invalid.clone(),
                });
                return Ok(LoadOutcome::Blocked { invalid });
            }
        }

        self.background.retain(|&i| i != index);
        if self.load_now(index).await {
            Ok(LoadOutcome::Loaded)
        } else {
            let message = self.states[index].error.clone().unwrap_or_default();
            Ok(LoadOutcome::Failed(message))
        }
    }

    /// Tabs currently keeping `index` from loading on demand
    ///
    /// Empty unless `index` requires validation; otherwise the loaded,
    /// enabled, editable tabs that report invalid.
    #[must_use]
    pub fn load_gate(&self, index: usize) -> Vec<usize> {
        match self.tabs.get(index) {
            Some(tab) if tab.requires_validation => self.invalid_tabs(),
            _ => Vec::new(),
        }
    }

    /// Loaded, enabled, editable tabs whose mirrored state is invalid
    #[must_use]
    pub fn invalid_tabs(&self) -> Vec<usize> {
        self.tabs
            .iter()
            .zip(&self.states)
            .enumerate()
            .filter(|(_, (tab, state))| tab.enabled && !tab.read_only && state.loaded() && !state.valid)
            .map(|(i, _)| i)
            .collect()
    }

    fn holds_unfinished_work(&self, index: usize) -> bool {
        let state = &self.states[index];
        !self.tabs[index].read_only && state.loaded() && (!state.valid || state.dirty)
    }

    fn set_selected(&mut self, index: usize) {
        let previous = self.selected.replace(index);
        if previous != Some(index) {
            self.emit(TabGroupEvent::SelectionChanged {
                previous,
                current: index,
            });
        }
    }

    // ------------------------------------------------------------------
    // Save-All
    // ------------------------------------------------------------------

    /// Run the Save-All protocol
    ///
    /// 1. Auto-load unloaded enabled tabs (bounded concurrency, per-tab timeout)
    /// 2. Validate tabs in descriptor order; the first failing tab is selected
    /// 3. Aggregate (parent mode) or save each editable tab in order (internal mode)
    /// 4. Emit completion
    ///
    /// # Errors
    /// - `TabGroupError::LoadTimeout` / `LoadFailed` when auto-loading fails
    /// - `TabGroupError::SaveFailed` when a tab's save rejects; tabs saved
    ///   before it stay saved and later tabs are not attempted
    pub async fn save_all(&mut self) -> Result<SaveAllOutcome, TabGroupError> {
        let run = RunId::new();
        let span = tracing::info_span!("save_all", %run, mode = ?self.config.save_mode);
        self.run_save_all(run).instrument(span).await
    }

    async fn run_save_all(&mut self, run: RunId) -> Result<SaveAllOutcome, TabGroupError> {
        self.sync_status();

        if self.config.auto_load.is_enabled() {
            if let Err(err) = self.auto_load(run).await {
                self.progress_error(run, &err);
                return Err(err);
            }
        }

        self.progress(SaveProgress::new(run, SavePhase::Validate));
        if let Some(block) = self.first_blocking_tab() {
            tracing::info!(index = block.index, id = %block.id, reason = ?block.reason, "save-all blocked");
            self.set_selected(block.index);
            return Ok(SaveAllOutcome::Blocked(block));
        }

        let outcome = match self.config.save_mode {
            SaveMode::Parent => {
                let payload = self.aggregate();
                self.progress(
                    SaveProgress::new(run, SavePhase::Emit)
                        .with_message(format!("{} tabs in payload", payload.len())),
                );
                self.emit(TabGroupEvent::Payload {
                    run,
                    payload: payload.clone(),
                });
                SaveAllOutcome::Aggregated(payload)
            }
            SaveMode::Internal => match self.save_each(run).await {
                Ok(saved) => SaveAllOutcome::Saved(saved),
                Err(err) => {
                    self.progress_error(run, &err);
                    return Err(err);
                }
            },
        };

        self.progress(SaveProgress::new(run, SavePhase::Complete));
        tracing::info!("save-all complete");
        Ok(outcome)
    }

    async fn auto_load(&mut self, run: RunId) -> Result<(), TabGroupError> {
        let targets: Vec<usize> = self
            .enabled_indices()
            .into_iter()
            .filter(|&i| !self.states[i].loaded())
            .collect();
        let total = targets.len();

        self.progress(SaveProgress::new(run, SavePhase::Autoload).with_counts(total, 0));
        if targets.is_empty() {
            return Ok(());
        }

        let timeout = self.config.auto_load_timeout();
        let retry = self.config.surface_retry();
        let limit = self.config.effective_concurrency();
        tracing::info!(total, limit, timeout_ms = self.config.auto_load_timeout_ms, "auto-loading tabs");

        for &index in &targets {
            self.states[index].loading = true;
        }
        let jobs: Vec<_> = targets
            .iter()
            .map(|&index| {
                let factory = Arc::clone(&self.tabs[index].factory);
                let ctx = self.context(index);
                // Deadline starts when the job enters the pool, not when queued.
                async move {
                    let result = tokio::time::timeout(timeout, materialize(factory, ctx, retry)).await;
                    (index, result)
                }
            })
            .collect();
        self.background.retain(|i| !targets.contains(i));

        let mut pool = stream::iter(jobs).buffer_unordered(limit);
        let mut loaded = 0;
        let mut failure = None;

        while let Some((index, result)) = pool.next().await {
            let id = self.tabs[index].id.clone();
            match result {
                Ok(Ok(instance)) => {
                    self.install(index, instance);
                    loaded += 1;
                    self.progress(
                        SaveProgress::new(run, SavePhase::Autoload)
                            .with_counts(total, loaded)
                            .with_tab(index, &id),
                    );
                }
                Ok(Err(source)) => {
                    self.fail_load(index, source.to_string());
                    failure = Some(TabGroupError::LoadFailed { index, id, source });
                    break;
                }
                Err(_) => {
                    let timeout_ms = self.config.auto_load_timeout_ms;
                    self.fail_load(index, format!("timed out after {timeout_ms}ms"));
                    failure = Some(TabGroupError::LoadTimeout { index, id, timeout_ms });
                    break;
                }
            }
        }
        drop(pool);

        for &index in &targets {
            self.states[index].loading = false;
        }

        if let Some(err) = failure {
            if let Some(first) = targets.iter().copied().find(|&i| !self.states[i].loaded()) {
                self.set_selected(first);
            }
            tracing::warn!(error = %err, "auto-load aborted");
            return Err(err);
        }
        Ok(())
    }

    fn first_blocking_tab(&mut self) -> Option<SaveBlock> {
        let parent = self.config.save_mode == SaveMode::Parent;

        for index in 0..self.tabs.len() {
            let tab = &self.tabs[index];
            if !tab.enabled {
                continue;
            }

            if !self.states[index].loaded() {
                let needed = !tab.read_only || (parent && tab.include_in_global_payload);
                if needed {
                    return Some(SaveBlock {
                        index,
                        id: tab.id.clone(),
                        reason: BlockReason::NotLoaded,
                    });
                }
                continue;
            }

            self.refresh(index);
            let tab = &self.tabs[index];
            if !tab.read_only && !self.states[index].valid {
                return Some(SaveBlock {
                    index,
                    id: tab.id.clone(),
                    reason: BlockReason::Invalid,
                });
            }
        }
        None
    }

    fn aggregate(&self) -> SavePayload {
        let data: IndexMap<String, _> = self
            .tabs
            .iter()
            .zip(&self.states)
            .filter(|(tab, _)| tab.enabled && tab.include_in_global_payload)
            .filter_map(|(tab, state)| {
                state
                    .instance
                    .as_ref()
                    .map(|instance| (tab.id.clone(), instance.data()))
            })
            .collect();
        SavePayload(data)
    }

    async fn save_each(&mut self, run: RunId) -> Result<Vec<String>, TabGroupError> {
        let mut saved = Vec::new();

        for index in 0..self.tabs.len() {
            let tab = &self.tabs[index];
            if !tab.enabled || tab.read_only || !self.states[index].loaded() {
                continue;
            }
            let id = tab.id.clone();

            self.progress(SaveProgress::new(run, SavePhase::Saving).with_tab(index, &id));
            self.save_instance(index).await?;
            tracing::debug!(index, id = %id, "tab saved");
            saved.push(id);
        }
        Ok(saved)
    }

    async fn save_instance(&mut self, index: usize) -> Result<(), TabGroupError> {
        let Some(instance) = self.states[index].instance.as_mut() else {
            return Ok(());
        };

        if let Err(source) = instance.save().await {
            let id = self.tabs[index].id.clone();
            tracing::warn!(index, id = %id, error = %source, "tab save failed");
            return Err(TabGroupError::SaveFailed { index, id, source });
        }
        let valid = instance.is_valid();
        self.record_status(index, valid, false);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Per-tab and bulk save/reset
    // ------------------------------------------------------------------

    /// Save one tab
    ///
    /// Returns `false` without saving when the tab is disabled, read-only,
    /// unloaded or invalid.
    ///
    /// # Errors
    /// - `TabGroupError::UnknownTab` for an out-of-range index
    /// - `TabGroupError::SaveFailed` when the body rejects the save
    pub async fn save_tab(&mut self, index: usize) -> Result<bool, TabGroupError> {
        self.check_index(index)?;
        self.sync_status();

        let tab = &self.tabs[index];
        if !tab.enabled || tab.read_only || !self.states[index].loaded() {
            return Ok(false);
        }
        self.refresh(index);
        if !self.states[index].valid {
            return Ok(false);
        }

        self.save_instance(index).await?;
        Ok(true)
    }

    /// Reset one tab
    ///
    /// Returns `false` when the tab is not loaded.
    ///
    /// # Errors
    /// Returns `TabGroupError::UnknownTab` for an out-of-range index.
    pub fn reset_tab(&mut self, index: usize) -> Result<bool, TabGroupError> {
        self.check_index(index)?;
        self.sync_status();
        Ok(self.reset_instance(index))
    }

    /// Reset every loaded tab; unloaded tabs are untouched
    ///
    /// Returns the number of tabs reset.
    pub fn reset_all(&mut self) -> usize {
        self.sync_status();
        (0..self.states.len()).filter(|&i| self.reset_instance(i)).count()
    }

    fn reset_instance(&mut self, index: usize) -> bool {
        let Some(instance) = self.states[index].instance.as_mut() else {
            return false;
        };
        instance.reset();
        let valid = instance.is_valid();
        self.record_status(index, valid, false);
        true
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// True iff every enabled tab is read-only or loaded and valid
    ///
    /// Disabled tabs never block, whatever their load state.
    #[must_use]
    pub fn can_save_all(&self) -> bool {
        self.tabs
            .iter()
            .zip(&self.states)
            .all(|(tab, state)| !tab.enabled || tab.read_only || (state.loaded() && state.valid))
    }

    /// True iff at least one tab is loaded
    #[must_use]
    pub fn has_any_loaded(&self) -> bool {
        self.states.iter().any(TabRuntimeState::loaded)
    }

    /// Index of the selected tab
    #[inline]
    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Descriptor of the selected tab
    #[must_use]
    pub fn selected_tab(&self) -> Option<&TabDescriptor> {
        self.selected.map(|i| &self.tabs[i])
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TabGroupConfig {
        &self.config
    }

    /// Descriptor list
    #[inline]
    #[must_use]
    pub fn tabs(&self) -> &[TabDescriptor] {
        &self.tabs
    }

    /// Descriptor at `index`
    #[inline]
    #[must_use]
    pub fn tab(&self, index: usize) -> Option<&TabDescriptor> {
        self.tabs.get(index)
    }

    /// Index of the tab with `id`
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Runtime state at `index`
    #[inline]
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&TabRuntimeState> {
        self.states.get(index)
    }

    /// Status snapshot at `index`
    #[must_use]
    pub fn status(&self, index: usize) -> Option<TabStatus> {
        self.states.get(index).map(TabRuntimeState::status)
    }

    /// Live body at `index`
    #[must_use]
    pub fn instance(&self, index: usize) -> Option<&dyn TabContract> {
        self.states.get(index)?.instance.as_deref()
    }

    /// Live body at `index`, for hosts forwarding user edits
    pub fn instance_mut(&mut self, index: usize) -> Option<&mut (dyn TabContract + 'static)> {
        self.states.get_mut(index)?.instance.as_deref_mut()
    }

    /// Effective load strategy of the tab at `index`
    #[must_use]
    pub fn effective_mode(&self, index: usize) -> Option<LoadStrategy> {
        self.tabs
            .get(index)
            .map(|t| t.effective_mode(self.config.load_strategy))
    }

    /// Number of tabs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Check if the group has no tabs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_index(&self, index: usize) -> Result<(), TabGroupError> {
        if index < self.tabs.len() {
            Ok(())
        } else {
            Err(TabGroupError::UnknownTab {
                index,
                len: self.tabs.len(),
            })
        }
    }

    fn enabled_indices(&self) -> Vec<usize> {
        self.tabs
            .iter()
            .enumerate()
            .filter(|(_, t)| t.enabled)
            .map(|(i, _)| i)
            .collect()
    }

    fn effective_mode_of(&self, index: usize) -> LoadStrategy {
        self.tabs[index].effective_mode(self.config.load_strategy)
    }

    fn context(&self, index: usize) -> TabContext {
        TabContext {
            index,
            id: self.tabs[index].id.clone(),
            notifier: StatusNotifier::new(self.generation, index, self.status_tx.clone()),
        }
    }

    /// Materialize one tab on the caller's task; returns whether it loaded
    async fn load_now(&mut self, index: usize) -> bool {
        self.states[index].loading = true;
        let factory = Arc::clone(&self.tabs[index].factory);
        let ctx = self.context(index);

        match materialize(factory, ctx, self.config.surface_retry()).await {
            Ok(instance) => {
                self.install(index, instance);
                true
            }
            Err(err) => {
                self.fail_load(index, err.to_string());
                false
            }
        }
    }

    fn install(&mut self, index: usize, mut instance: Box<dyn TabContract>) {
        let tab = &self.tabs[index];

        if let Some(seed) = &tab.seed {
            if let Some(seedable) = instance.seedable() {
                seedable.initialize_data(seed);
            }
        }
        if tab.read_only {
            if let Some(toggle) = instance.read_only_capable() {
                toggle.set_read_only(true);
            }
        }

        self.states[index].attach(instance);
        let id = tab.id.clone();
        tracing::debug!(index, id = %id, "tab loaded");
        self.emit(TabGroupEvent::TabLoaded { index, id });
    }

    fn fail_load(&mut self, index: usize, message: String) {
        let state = &mut self.states[index];
        state.loading = false;
        state.error = Some(message.clone());

        let id = self.tabs[index].id.clone();
        tracing::warn!(index, id = %id, error = %message, "tab failed to load");
        self.emit(TabGroupEvent::LoadFailed { index, id, message });
    }

    fn emit(&self, event: TabGroupEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn progress(&self, progress: SaveProgress) {
        if self.config.emit_progress {
            self.emit(TabGroupEvent::Progress(progress));
        }
    }

    fn progress_error(&self, run: RunId, err: &TabGroupError) {
        let mut event = SaveProgress::new(run, SavePhase::Error)
            .with_error(err.phase().unwrap_or(SavePhase::Error), err.to_string());
        if let (Some(index), Some(id)) = (err.tab_index(), err.tab_id()) {
            event = event.with_tab(index, id);
        }
        self.progress(event);
    }
}

impl std::fmt::Debug for TabGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabGroup")
            .field("config", &self.config)
            .field("tabs", &self.tabs)
            .field("states", &self.states)
            .field("selected", &self.selected)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Default for TabGroup {
    fn default() -> Self {
        Self::new(TabGroupConfig::default())
    }
}

/// Wait for the rendering surface, then build the body
async fn materialize(
    factory: Arc<dyn TabFactory>,
    ctx: TabContext,
    retry: Duration,
) -> Result<Box<dyn TabContract>, TabError> {
    while !factory.surface_ready(&ctx) {
        tokio::time::sleep(retry).await;
    }
    factory.create(ctx)
}

fn validate_descriptors(tabs: &[TabDescriptor]) -> Result<(), TabGroupError> {
    let mut seen = HashSet::with_capacity(tabs.len());
    for tab in tabs {
        if tab.id.trim().is_empty() {
            return Err(TabGroupError::InvalidDescriptors(format!(
                "tab '{}' has an empty id",
                tab.label
            )));
        }
        if !seen.insert(tab.id.as_str()) {
            return Err(TabGroupError::InvalidDescriptors(format!(
                "duplicate tab id '{}'",
                tab.id
            )));
        }
    }
    Ok(())
}
