//! In-memory form views
//!
//! Each tab body is a flat map of field values. A form is valid when all of
//! its required fields are filled, and dirty while its fields differ from the
//! last saved snapshot. The demo edits forms through a shared [`FormStore`],
//! the way a UI forwards keystrokes to a mounted view.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tabgroup_core::{
    DataSeedable, ReadOnlyCapable, StatusNotifier, TabContext, TabContract, TabData, TabError,
    TabFactory, ViewRegistry,
};

/// Simulated backend round trip per save
const SAVE_LATENCY: Duration = Duration::from_millis(5);

/// Views of the booking screen and their required fields
pub(crate) const BOOKING_VIEWS: &[(&str, &[&str])] = &[
    ("customer", &["name", "email"]),
    ("loan", &["amount", "term-months"]),
    ("collateral", &["kind"]),
    ("documents", &["checklist"]),
    ("review", &[]),
];

#[derive(Debug)]
struct FormState {
    fields: Map<String, Value>,
    saved: Map<String, Value>,
    required: &'static [&'static str],
    read_only: bool,
    saves: usize,
    notifier: StatusNotifier,
}

impl FormState {
    fn is_valid(&self) -> bool {
        self.required
            .iter()
            .all(|name| self.fields.get(*name).is_some_and(is_filled))
    }

    fn is_dirty(&self) -> bool {
        self.fields != self.saved
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

type SharedForm = Arc<Mutex<FormState>>;

/// Mounted forms by tab id
#[derive(Debug, Clone, Default)]
pub(crate) struct FormStore(Arc<Mutex<HashMap<String, SharedForm>>>);

impl FormStore {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn form(&self, tab: &str) -> anyhow::Result<SharedForm> {
        self.0
            .lock()
            .get(tab)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("tab '{tab}' is not mounted"))
    }

    /// Set one field of a mounted form and notify the engine
    ///
    /// # Errors
    /// Fails when the tab is not mounted or is read-only.
    pub(crate) fn edit(&self, tab: &str, field: &str, value: Value) -> anyhow::Result<()> {
        let form = self.form(tab)?;
        let notifier = {
            let mut state = form.lock();
            if state.read_only {
                anyhow::bail!("tab '{tab}' is read-only");
            }
            state.fields.insert(field.to_string(), value);
            state.notifier.clone()
        };
        tracing::debug!(tab, field, "form edited");
        notifier.notify();
        Ok(())
    }

    #[must_use]
    pub(crate) fn is_mounted(&self, tab: &str) -> bool {
        self.0.lock().contains_key(tab)
    }

    /// Successful saves of a mounted form
    #[must_use]
    pub(crate) fn saves(&self, tab: &str) -> usize {
        self.form(tab).map(|form| form.lock().saves).unwrap_or(0)
    }
}

/// Tab body backed by a [`FormStore`] entry
#[derive(Debug)]
pub(crate) struct FormView {
    form: SharedForm,
}

#[async_trait]
impl TabContract for FormView {
    fn is_valid(&self) -> bool {
        self.form.lock().is_valid()
    }

    fn is_dirty(&self) -> bool {
        self.form.lock().is_dirty()
    }

    async fn save(&mut self) -> Result<(), TabError> {
        tokio::time::sleep(SAVE_LATENCY).await;

        let mut state = self.form.lock();
        if state.read_only {
            return Err(TabError::rejected("form is read-only"));
        }
        if !state.is_valid() {
            return Err(TabError::rejected("required fields are missing"));
        }
        state.saved = state.fields.clone();
        state.saves += 1;
        Ok(())
    }

    fn reset(&mut self) {
        let mut state = self.form.lock();
        state.fields = state.saved.clone();
    }

    fn data(&self) -> TabData {
        Value::Object(self.form.lock().fields.clone())
    }

    fn read_only_capable(&mut self) -> Option<&mut dyn ReadOnlyCapable> {
        Some(self as &mut dyn ReadOnlyCapable)
    }

    fn seedable(&mut self) -> Option<&mut dyn DataSeedable> {
        Some(self as &mut dyn DataSeedable)
    }
}

impl ReadOnlyCapable for FormView {
    fn set_read_only(&mut self, read_only: bool) {
        self.form.lock().read_only = read_only;
    }
}

impl DataSeedable for FormView {
    fn initialize_data(&mut self, seed: &TabData) {
        if let Value::Object(fields) = seed {
            let mut state = self.form.lock();
            state.fields = fields.clone();
            state.saved = fields.clone();
        }
    }
}

/// Builds [`FormView`]s and mounts them in a store
#[derive(Debug)]
pub(crate) struct FormFactory {
    required: &'static [&'static str],
    store: FormStore,
}

impl FormFactory {
    #[must_use]
    pub(crate) fn new(required: &'static [&'static str], store: FormStore) -> Self {
        Self { required, store }
    }
}

impl TabFactory for FormFactory {
    fn create(&self, ctx: TabContext) -> Result<Box<dyn TabContract>, TabError> {
        let form = Arc::new(Mutex::new(FormState {
            fields: Map::new(),
            saved: Map::new(),
            required: self.required,
            read_only: false,
            saves: 0,
            notifier: ctx.notifier,
        }));
        self.store.0.lock().insert(ctx.id, Arc::clone(&form));
        Ok(Box::new(FormView { form }))
    }
}

/// Registry with every booking view mounted into `store`
#[must_use]
pub(crate) fn booking_registry(store: &FormStore) -> ViewRegistry {
    let mut registry = ViewRegistry::new();
    for &(view, required) in BOOKING_VIEWS {
        registry.register(view, Arc::new(FormFactory::new(required, store.clone())));
    }
    registry
}
