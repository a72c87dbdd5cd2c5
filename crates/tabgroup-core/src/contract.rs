//! Tab body contract
//!
//! Every view rendered inside a tab implements [`TabContract`]. Views are
//! built at runtime by a [`TabFactory`] held in the tab's descriptor, and
//! push validity/dirty changes to the engine through the [`StatusNotifier`]
//! found in their [`TabContext`].

use crate::error::TabError;
use std::fmt;
use tokio::sync::mpsc;

/// Serializable snapshot of a tab body's data
pub type TabData = serde_json::Value;

/// Capability interface of a live tab body
#[async_trait::async_trait]
pub trait TabContract: Send {
    /// Synchronous, side-effect-free validity check
    fn is_valid(&self) -> bool;

    /// Whether the body holds unsaved changes
    fn is_dirty(&self) -> bool;

    /// Persist current data
    ///
    /// # Errors
    /// Any error aborts the enclosing save and propagates to the caller.
    async fn save(&mut self) -> Result<(), TabError>;

    /// Revert to last-loaded or default state
    fn reset(&mut self);

    /// Extract a snapshot for parent-mode aggregation
    fn data(&self) -> TabData;

    /// Read-only toggle, when the body supports one
    fn read_only_capable(&mut self) -> Option<&mut dyn ReadOnlyCapable> {
        None
    }

    /// Initial-data hook, when the body supports one
    fn seedable(&mut self) -> Option<&mut dyn DataSeedable> {
        None
    }
}

/// Optional capability: toggle editability
pub trait ReadOnlyCapable {
    /// Enable or disable editing
    fn set_read_only(&mut self, read_only: bool);
}

/// Optional capability: seed initial values
pub trait DataSeedable {
    /// Apply a (partial) seed to the body
    fn initialize_data(&mut self, seed: &TabData);
}

/// Signal pushed by a tab body when its validity or dirtiness may have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StatusSignal {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

/// Handle a tab body uses to tell the engine its state changed
#[derive(Debug, Clone)]
pub struct StatusNotifier {
    generation: u64,
    index: usize,
    sender: mpsc::UnboundedSender<StatusSignal>,
}

impl StatusNotifier {
    pub(crate) fn new(
        generation: u64,
        index: usize,
        sender: mpsc::UnboundedSender<StatusSignal>,
    ) -> Self {
        Self {
            generation,
            index,
            sender,
        }
    }

    /// Notify the engine; a no-op once the engine has gone away
    pub fn notify(&self) {
        let _ = self.sender.send(StatusSignal {
            generation: self.generation,
            index: self.index,
        });
    }

    /// A notifier wired to nothing, for bodies constructed outside an engine
    #[must_use]
    pub fn detached() -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self {
            generation: 0,
            index: 0,
            sender,
        }
    }
}

/// Context handed to a factory when a tab body is created
#[derive(Debug, Clone)]
pub struct TabContext {
    /// Position of the tab in the descriptor list
    pub index: usize,
    /// Descriptor id
    pub id: String,
    /// Change notification handle for the body
    pub notifier: StatusNotifier,
}

impl TabContext {
    /// Context not attached to any engine
    #[must_use]
    pub fn detached(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            notifier: StatusNotifier::detached(),
        }
    }
}

/// Constructs tab bodies on demand
pub trait TabFactory: Send + Sync {
    /// Whether the rendering surface for this tab exists yet
    ///
    /// The engine polls until this returns true before calling [`create`](Self::create).
    fn surface_ready(&self, _ctx: &TabContext) -> bool {
        true
    }

    /// Build the body
    ///
    /// # Errors
    /// Returns [`TabError`] when the body cannot be constructed.
    fn create(&self, ctx: TabContext) -> Result<Box<dyn TabContract>, TabError>;
}

impl fmt::Debug for dyn TabFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TabFactory")
    }
}

/// Factory backed by a closure
pub struct FnFactory<F> {
    build: F,
}

impl<F> TabFactory for FnFactory<F>
where
    F: Fn(TabContext) -> Result<Box<dyn TabContract>, TabError> + Send + Sync,
{
    fn create(&self, ctx: TabContext) -> Result<Box<dyn TabContract>, TabError> {
        (self.build)(ctx)
    }
}

/// Wrap a closure as a shareable factory
pub fn factory_fn<F>(build: F) -> std::sync::Arc<dyn TabFactory>
where
    F: Fn(TabContext) -> Result<Box<dyn TabContract>, TabError> + Send + Sync + 'static,
{
    std::sync::Arc::new(FnFactory { build })
}
