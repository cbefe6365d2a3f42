#![forbid(unsafe_code)]

//! Collaborator interfaces at the edge of the navigation core.
//!
//! The controller never touches rendering, media, analytics, or the host
//! transport directly. It drives these traits; hosts implement them.

use std::fmt;

use async_trait::async_trait;
use storydeck_core::AdvancementMode;

/// Playback state of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Active page: media plays, timers run.
    Playing,
    /// Active page, visible but held.
    Paused,
    /// Not the active page.
    NotActive,
}

/// Rendered pages, as seen by the controller.
#[async_trait]
pub trait PageSurface: Send + Sync {
    fn set_page_state(&self, page_id: &str, state: PageState);

    /// Mark a page as the visible one (or not).
    fn set_visible(&self, page_id: &str, visible: bool);

    fn set_visited(&self, page_id: &str, visited: bool);

    /// Replace all desktop panel offsets with `positions`.
    fn set_desktop_positions(&self, positions: &[(String, i8)]);

    fn set_distance(&self, page_id: &str, distance: u32);

    fn set_ad_showing(&self, showing: bool);

    /// Advance the progress bar to `page_id`.
    fn update_progress(&self, page_id: &str);

    /// Force the engine to repaint the viewport.
    fn force_repaint(&self);

    /// Resolve once `page_id` has loaded its content.
    async fn when_loaded(&self, page_id: &str);
}

/// Messages sent to the embedding host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// Ask the host to show the next or previous document.
    SelectDocument {
        next: bool,
        advancement_mode: AdvancementMode,
    },
    /// The story finished its initial load.
    StoryContentLoaded,
}

impl HostMessage {
    /// Wire name of the message.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectDocument { .. } => "selectDocument",
            Self::StoryContentLoaded => "storyContentLoaded",
        }
    }
}

impl fmt::Display for HostMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transport to the embedding host.
pub trait HostMessenger: Send + Sync {
    /// Capabilities the host advertised (for example `swipe`).
    fn has_capability(&self, capability: &str) -> bool;

    fn send(&self, message: HostMessage);
}

/// Host capability for swiping between documents.
pub const SWIPE_CAPABILITY: &str = "swipe";

/// Host that advertises nothing and drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl HostMessenger for NoHost {
    fn has_capability(&self, _capability: &str) -> bool {
        false
    }

    fn send(&self, message: HostMessage) {
        tracing::trace!(message = %message, "no host attached; dropping message");
    }
}

/// Story-level events for analytics, triggers, and developer tooling.
///
/// Every method defaults to a no-op.
pub trait StoryObserver: Send + Sync {
    /// A page became active after a completed switch.
    fn on_page_active(&self, _page_id: &str) {}

    /// Developer log output should now refer to `page_id`.
    fn on_log_context(&self, _page_id: &str) {}

    /// Initial content finished loading (or the load timeout elapsed).
    fn on_story_loaded(&self) {}

    /// Show the hint explaining how to go back.
    fn on_previous_page_help(&self) {}

    /// The page whose attachment was open last session is active again.
    fn on_reopen_attachment(&self, _page_id: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StoryObserver for NoopObserver {}
