#![forbid(unsafe_code)]

//! Errors raised by the synchronous navigation core.

use thiserror::Error;

/// Programming errors surfaced by the string-keyed store surface and the
/// page graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A property name that no [`StateProperty`](crate::state::StateProperty) carries.
    #[error("unknown state property: {0}")]
    UnknownProperty(String),

    /// An action name with no matching [`Action`](crate::action::Action) variant.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A page id that is not part of the page graph.
    #[error("unknown page id: {0}")]
    UnknownPage(String),

    /// Page insertion needs a page after the insertion point.
    #[error("cannot insert after {0}: it has no next page")]
    NoNextPage(String),
}
