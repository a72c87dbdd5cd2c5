//! Tab Group Core - headless tab-group orchestration
//!
//! The engine behind multi-tab editing screens:
//! - Materializes tab bodies per load strategy (eager, lazy, on-click)
//! - Guards navigation away from dirty or invalid tabs
//! - Gates on-click tabs behind validation of the loaded tabs
//! - Runs Save-All: bounded auto-load, ordered validation, then either a
//!   parent-aggregated payload or sequential per-tab saves
//! - Reports progress and results through an event channel
//!
//! # Example
//!
//! ```rust,ignore
//! use tabgroup_core::prelude::*;
//!
//! # async fn example(tabs: Vec<TabDescriptor>) -> Result<(), TabGroupError> {
//! let config = TabGroupConfig::new().with_save_mode(SaveMode::Parent);
//! let mut group = TabGroup::with_tabs(config, tabs).await?;
//! let mut events = group.subscribe();
//!
//! group.settle().await;
//! if let SaveAllOutcome::Aggregated(payload) = group.save_all().await? {
//!     println!("saving {} tabs", payload.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod affordance;
pub mod config;
pub mod contract;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod manifest;
pub mod state;

// Re-exports for convenience
pub use affordance::{AffordanceIcon, AffordanceTone, TabAffordance};
pub use config::{AutoLoadPolicy, SaveMode, TabGroupConfig};
pub use contract::{
    factory_fn, DataSeedable, FnFactory, ReadOnlyCapable, StatusNotifier, TabContext,
    TabContract, TabData, TabFactory,
};
pub use descriptor::{LoadStrategy, TabDescriptor};
pub use engine::{
    BlockReason, LoadOutcome, SaveAllOutcome, SaveBlock, SwitchOutcome, TabGroup,
};
pub use error::{ConfigError, TabError, TabGroupError};
pub use events::{RunId, SavePayload, SavePhase, SaveProgress, TabGroupEvent};
pub use manifest::{TabManifest, TabSpec, ViewRegistry};
pub use state::{TabRuntimeState, TabStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the tab group engine
    pub use crate::{
        factory_fn, AutoLoadPolicy, LoadStrategy, SaveAllOutcome, SaveMode, SwitchOutcome,
        TabContext, TabContract, TabData, TabDescriptor, TabError, TabFactory, TabGroup,
        TabGroupConfig, TabGroupError, TabGroupEvent,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
