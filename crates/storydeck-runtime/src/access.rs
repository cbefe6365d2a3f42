#![forbid(unsafe_code)]

//! Access gating for paywalled or consent-gated pages.
//!
//! # Design Invariants
//!
//! 1. **Single pending slot**: at most one deferred target; a newer request
//!    overwrites the older one.
//! 2. **Fail closed**: an authorization error counts as `Blocked` and keeps
//!    the pending target for the next authorization round.
//! 3. **No authorizer, no gate**: without an [`Authorizer`] every page is open.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `AccessError::Request` | Entitlement service unreachable | `warn!`, `Blocked` |
//! | `AccessError::Timeout` | Slow entitlement service | `warn!`, `Blocked` |

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use storydeck_core::Page;

use crate::error::AccessError;

/// External entitlement service.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether the service finished its first authorization round.
    fn first_check_completed(&self) -> bool;

    /// Whether the reader may see `page_id`.
    async fn check_authorization(&self, page_id: &str) -> Result<bool, AccessError>;
}

/// Gate state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// No authorizer configured.
    NotRequired,
    /// A navigation is waiting on authorization.
    Pending,
    /// Nothing is waiting.
    Resolved,
}

/// Result of one authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The first authorization round has not completed yet.
    Pending,
    Granted,
    Blocked,
}

/// Whether navigation to a page may proceed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCheck {
    Open,
    /// Page needs access and the first authorization round is still running.
    AwaitFirstCheck,
    /// Page stays hidden until authorization grants it.
    HiddenUntilAuthorized,
}

/// Tracks authorization progress and the deferred navigation target.
pub struct AccessGate {
    authorizer: Option<Arc<dyn Authorizer>>,
    first_check_completed: AtomicBool,
    pending: Mutex<Option<String>>,
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

impl AccessGate {
    #[must_use]
    pub fn new(authorizer: Option<Arc<dyn Authorizer>>) -> Self {
        Self {
            authorizer,
            first_check_completed: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    /// Gate with no authorizer: every page is open.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn state(&self) -> AccessState {
        if self.authorizer.is_none() {
            AccessState::NotRequired
        } else if self.lock_pending().is_some() {
            AccessState::Pending
        } else {
            AccessState::Resolved
        }
    }

    #[must_use]
    pub fn first_check_completed(&self) -> bool {
        self.first_check_completed.load(Ordering::Acquire)
            || self
                .authorizer
                .as_ref()
                .is_some_and(|a| a.first_check_completed())
    }

    pub fn mark_first_check_completed(&self) {
        self.first_check_completed.store(true, Ordering::Release);
    }

    /// Decide whether navigating to `page` may proceed now.
    #[must_use]
    pub fn check(&self, page: &Page) -> GateCheck {
        if self.authorizer.is_none() {
            return GateCheck::Open;
        }
        if page.requires_access && !self.first_check_completed() {
            return GateCheck::AwaitFirstCheck;
        }
        if page.hidden_until_authorized {
            return GateCheck::HiddenUntilAuthorized;
        }
        GateCheck::Open
    }

    /// Store `page_id` as the deferred target. Returns the target it replaced.
    pub fn defer(&self, page_id: &str) -> Option<String> {
        let replaced = self.lock_pending().replace(page_id.to_string());
        if let Some(old) = &replaced {
            tracing::debug!(page_id, replaced = %old, "pending navigation overwritten");
        }
        replaced
    }

    #[must_use]
    pub fn pending(&self) -> Option<String> {
        self.lock_pending().clone()
    }

    /// Clear the pending slot if it still holds `page_id`.
    pub fn clear_pending_if(&self, page_id: &str) -> bool {
        let mut pending = self.lock_pending();
        if pending.as_deref() == Some(page_id) {
            *pending = None;
            true
        } else {
            false
        }
    }

    /// Ask the authorizer about `page_id`.
    pub async fn authorize(&self, page_id: &str) -> AccessDecision {
        let Some(authorizer) = self.authorizer.clone() else {
            return AccessDecision::Granted;
        };
        if !self.first_check_completed() {
            return AccessDecision::Pending;
        }
        match authorizer.check_authorization(page_id).await {
            Ok(true) => AccessDecision::Granted,
            Ok(false) => AccessDecision::Blocked,
            Err(err) => {
                tracing::warn!(page_id, error = %err, "authorization failed; treating as blocked");
                AccessDecision::Blocked
            }
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
