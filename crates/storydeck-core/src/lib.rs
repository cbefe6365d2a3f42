#![forbid(unsafe_code)]

//! Core: state store, page graph, navigation path, and distance calculation.
//!
//! Everything here is synchronous and free of I/O. The async orchestration
//! (transitions, access gating, persistence) lives in `storydeck-runtime`.

pub mod action;
pub mod distance;
pub mod error;
pub mod navigation_path;
pub mod page;
pub mod reducer;
pub mod state;
pub mod store;

pub use action::Action;
pub use distance::{DistanceOptions, PageDistances, page_distances};
pub use error::StoreError;
pub use navigation_path::{NavigationDirection, NavigationPath};
pub use page::{Page, PageGraph};
pub use reducer::reduce;
pub use state::{
    AdvancementMode, Comparator, EmbedMode, StateProperty, StateValue, StoryState, UiType,
};
pub use store::{Listener, Store, Subscription};
