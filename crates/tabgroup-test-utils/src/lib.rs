//! Testing utilities for the tab group workspace
//!
//! Scripted tab bodies whose validity, dirtiness, data and save behavior are
//! driven from the test through a [`TabHandle`], plus a shared [`Journal`]
//! recording every body call in order.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tabgroup_core::{
    DataSeedable, ReadOnlyCapable, StatusNotifier, TabContext, TabContract, TabData, TabDescriptor,
    TabError, TabFactory, TabGroup, TabGroupConfig, TabGroupEvent,
};
use tokio::sync::mpsc;

/// One recorded call on a scripted body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Save(String),
    Reset(String),
    Seed(String),
    ReadOnly(String, bool),
}

/// Ordered record of body calls across all tabs of a test
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    /// Ids of tabs whose save was called, in order
    pub fn saves(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Save(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Ids of tabs created, in order
    pub fn creates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

/// When a scripted factory's rendering surface appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Ready,
    /// Ready after this many not-ready polls
    AfterPolls(usize),
    Never,
}

#[derive(Debug)]
struct HandleState {
    valid: bool,
    dirty: bool,
    data: TabData,
    save_error: Option<String>,
    valid_after_reset: Option<bool>,
    read_only: bool,
    seed: Option<TabData>,
    resets: usize,
    notifier: Option<StatusNotifier>,
}

/// Test-side handle on a scripted body
#[derive(Debug, Clone)]
pub struct TabHandle(Arc<Mutex<HandleState>>);

impl TabHandle {
    fn new(id: &str) -> Self {
        Self(Arc::new(Mutex::new(HandleState {
            valid: true,
            dirty: false,
            data: json!({ "tab": id }),
            save_error: None,
            valid_after_reset: None,
            read_only: false,
            seed: None,
            resets: 0,
            notifier: None,
        })))
    }

    fn notify(&self) {
        let notifier = self.0.lock().notifier.clone();
        if let Some(notifier) = notifier {
            notifier.notify();
        }
    }

    /// Simulate an edit changing validity; notifies the engine
    pub fn set_valid(&self, valid: bool) {
        self.0.lock().valid = valid;
        self.notify();
    }

    /// Simulate an edit changing dirtiness; notifies the engine
    pub fn set_dirty(&self, dirty: bool) {
        self.0.lock().dirty = dirty;
        self.notify();
    }

    /// Change validity without notifying
    pub fn set_valid_silently(&self, valid: bool) {
        self.0.lock().valid = valid;
    }

    pub fn set_data(&self, data: TabData) {
        self.0.lock().data = data;
    }

    /// Make every subsequent save reject
    pub fn fail_saves(&self, message: &str) {
        self.0.lock().save_error = Some(message.to_string());
    }

    /// Validity the body reports after a reset
    pub fn valid_after_reset(&self, valid: bool) {
        self.0.lock().valid_after_reset = Some(valid);
    }

    pub fn is_read_only(&self) -> bool {
        self.0.lock().read_only
    }

    pub fn seed(&self) -> Option<TabData> {
        self.0.lock().seed.clone()
    }

    pub fn resets(&self) -> usize {
        self.0.lock().resets
    }

    pub fn is_dirty(&self) -> bool {
        self.0.lock().dirty
    }
}

/// Body driven by a [`TabHandle`]
#[derive(Debug)]
pub struct ScriptedTab {
    id: String,
    handle: TabHandle,
    journal: Journal,
}

#[async_trait::async_trait]
impl TabContract for ScriptedTab {
    fn is_valid(&self) -> bool {
        self.handle.0.lock().valid
    }

    fn is_dirty(&self) -> bool {
        self.handle.0.lock().dirty
    }

    async fn save(&mut self) -> Result<(), TabError> {
        self.journal.push(Call::Save(self.id.clone()));
        tokio::task::yield_now().await;

        let mut state = self.handle.0.lock();
        if let Some(message) = &state.save_error {
            return Err(TabError::rejected(message.clone()));
        }
        state.dirty = false;
        Ok(())
    }

    fn reset(&mut self) {
        self.journal.push(Call::Reset(self.id.clone()));
        let mut state = self.handle.0.lock();
        state.resets += 1;
        state.dirty = false;
        if let Some(valid) = state.valid_after_reset {
            state.valid = valid;
        }
    }

    fn data(&self) -> TabData {
        self.handle.0.lock().data.clone()
    }

    fn read_only_capable(&mut self) -> Option<&mut dyn ReadOnlyCapable> {
        Some(self as &mut dyn ReadOnlyCapable)
    }

    fn seedable(&mut self) -> Option<&mut dyn DataSeedable> {
        Some(self as &mut dyn DataSeedable)
    }
}

impl ReadOnlyCapable for ScriptedTab {
    fn set_read_only(&mut self, read_only: bool) {
        self.journal.push(Call::ReadOnly(self.id.clone(), read_only));
        self.handle.0.lock().read_only = read_only;
    }
}

impl DataSeedable for ScriptedTab {
    fn initialize_data(&mut self, seed: &TabData) {
        self.journal.push(Call::Seed(self.id.clone()));
        self.handle.0.lock().seed = Some(seed.clone());
    }
}

/// Factory producing [`ScriptedTab`]s sharing one handle
#[derive(Debug)]
pub struct ScriptedFactory {
    handle: TabHandle,
    journal: Journal,
    surface: Surface,
    polls: AtomicUsize,
}

impl TabFactory for ScriptedFactory {
    fn surface_ready(&self, _ctx: &TabContext) -> bool {
        match self.surface {
            Surface::Ready => true,
            Surface::Never => false,
            Surface::AfterPolls(n) => self.polls.fetch_add(1, Ordering::SeqCst) >= n,
        }
    }

    fn create(&self, ctx: TabContext) -> Result<Box<dyn TabContract>, TabError> {
        self.journal.push(Call::Create(ctx.id.clone()));
        self.handle.0.lock().notifier = Some(ctx.notifier);
        Ok(Box::new(ScriptedTab {
            id: ctx.id,
            handle: self.handle.clone(),
            journal: self.journal.clone(),
        }))
    }
}

/// Factory whose bodies can never be constructed
#[derive(Debug)]
pub struct BrokenFactory;

impl TabFactory for BrokenFactory {
    fn create(&self, ctx: TabContext) -> Result<Box<dyn TabContract>, TabError> {
        Err(TabError::unavailable(format!("no view for {}", ctx.id)))
    }
}

/// Descriptor backed by a scripted body, plus the handle driving it
pub fn scripted(id: &str, journal: &Journal) -> (TabDescriptor, TabHandle) {
    scripted_with_surface(id, journal, Surface::Ready)
}

pub fn scripted_with_surface(id: &str, journal: &Journal, surface: Surface) -> (TabDescriptor, TabHandle) {
    let handle = TabHandle::new(id);
    let factory = ScriptedFactory {
        handle: handle.clone(),
        journal: journal.clone(),
        surface,
        polls: AtomicUsize::new(0),
    };
    let label = capitalize(id);
    (TabDescriptor::new(id, label, Arc::new(factory)), handle)
}

/// Descriptor whose factory always fails
pub fn broken(id: &str) -> TabDescriptor {
    TabDescriptor::new(id, capitalize(id), Arc::new(BrokenFactory))
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build and initialize a group
pub async fn setup_group(config: TabGroupConfig, tabs: Vec<TabDescriptor>) -> TabGroup {
    TabGroup::with_tabs(config, tabs)
        .await
        .expect("descriptor list should be valid")
}

/// Everything currently queued on an event receiver
pub fn drain(events: &mut mpsc::UnboundedReceiver<TabGroupEvent>) -> Vec<TabGroupEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Progress events only
pub fn progress_of(events: &[TabGroupEvent]) -> Vec<tabgroup_core::SaveProgress> {
    events
        .iter()
        .filter_map(|e| match e {
            TabGroupEvent::Progress(p) => Some(p.clone()),
            _ => None,
        })
        .collect()
}
