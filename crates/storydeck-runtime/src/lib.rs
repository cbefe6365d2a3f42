#![forbid(unsafe_code)]

//! Runtime: navigation controller, transition pipeline, access gating, and
//! persisted navigation history.

pub mod access;
pub mod config;
pub mod controller;
pub mod debug_trace;
pub mod error;
pub mod frame;
pub mod host;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod story;

pub use access::{AccessDecision, AccessGate, AccessState, Authorizer, GateCheck};
pub use config::{PersistenceConfig, Platform, StoryConfig};
pub use controller::{Collaborators, NavigationController, SelectPage, SwitchOutcome};
pub use error::{AccessError, NavigationError, NavigationResult, StorageError, StorageResult};
pub use frame::{FrameScheduler, ImmediateFrames, IntervalFrames};
pub use host::{
    HostMessage, HostMessenger, NoHost, NoopObserver, PageState, PageSurface, StoryObserver,
};
#[cfg(feature = "file-storage")]
pub use persistence::FileStorage;
pub use persistence::{MemoryStorage, NavigationHistory, PersistedNavigation, StorageBackend};
pub use pipeline::{TransitionPhase, TransitionPipeline};
pub use story::{LayoutOutcome, LoadOutcome, Story};
