#![forbid(unsafe_code)]

//! storydeck public facade.
//!
//! Re-exports the store and page graph from `storydeck-core` and the
//! navigation runtime from `storydeck-runtime`, plus a prelude for hosts.

// --- Core re-exports -------------------------------------------------------

pub use storydeck_core::{
    Action, AdvancementMode, Comparator, DistanceOptions, EmbedMode, NavigationDirection,
    NavigationPath, Page, PageDistances, PageGraph, StateProperty, StateValue, Store, StoreError,
    StoryState, Subscription, UiType, page_distances,
};

// --- Runtime re-exports ----------------------------------------------------

pub use storydeck_runtime::{
    AccessDecision, AccessError, AccessGate, AccessState, Authorizer, Collaborators,
    FrameScheduler, HostMessage, HostMessenger, ImmediateFrames, IntervalFrames, LayoutOutcome,
    LoadOutcome, MemoryStorage, NavigationController, NavigationError, NavigationHistory,
    NoHost, NoopObserver, PageState, PageSurface, PersistedNavigation, PersistenceConfig,
    Platform, SelectPage, StorageBackend, StorageError, Story, StoryConfig, StoryObserver,
    SwitchOutcome, TransitionPhase,
};

#[cfg(feature = "file-storage")]
pub use storydeck_runtime::FileStorage;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for storydeck hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Standard result type for storydeck APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Action, Collaborators, Error, NavigationDirection, Page, PageState, PageSurface, Result,
        StateProperty, Store, Story, StoryConfig, SwitchOutcome, UiType,
    };

    pub use crate::{core, runtime};
}

pub use storydeck_core as core;
pub use storydeck_runtime as runtime;
