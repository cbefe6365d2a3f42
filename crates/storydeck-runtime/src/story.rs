#![forbid(unsafe_code)]

//! Story lifecycle: construction, layout, and initial content load.
//!
//! A [`Story`] owns the store and the controller and wires the controller
//! to UI-mode and paused-state changes. [`Story::layout`] hydrates navigation history, picks
//! the initial page, switches to it, and waits (bounded) for it to load.

use std::sync::Arc;

use storydeck_core::{
    Action, NavigationDirection, Page, PageGraph, StateProperty, StateValue, Store, Subscription,
};

use crate::config::StoryConfig;
use crate::controller::{Collaborators, NavigationController};
use crate::error::{NavigationError, NavigationResult};
use crate::host::HostMessage;
use crate::persistence::{NavigationHistory, StorageBackend};

/// How the initial content load ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The timeout elapsed first; the story is considered loaded anyway.
    TimedOut,
}

/// Result of [`Story::layout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// The engine lacks required features; the host should show a fallback.
    Unsupported,
    Ready {
        initial_page: String,
        loaded: LoadOutcome,
    },
}

/// One presentation instance.
pub struct Story {
    store: Arc<Store>,
    controller: Arc<NavigationController>,
    subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for Story {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Story")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Story {
    #[must_use]
    pub fn new(
        config: StoryConfig,
        pages: Vec<Page>,
        collaborators: Collaborators,
        storage: Box<dyn StorageBackend>,
    ) -> Self {
        let store = Arc::new(Store::with_embed_mode(config.embed_mode));
        store.dispatch(Action::ToggleUi(config.effective_ui()));
        let graph = PageGraph::new(pages);
        store.dispatch(Action::SetPageIds(graph.ids()));

        let history = NavigationHistory::new(storage, config.persistence.namespace.clone());
        let controller = Arc::new(NavigationController::new(
            Arc::clone(&store),
            graph,
            config,
            collaborators,
            history,
        ));

        let weak = Arc::downgrade(&controller);
        let ui_subscription = store.subscribe(
            StateProperty::UiState,
            move |value| {
                if let (Some(controller), StateValue::Ui(ui)) = (weak.upgrade(), value) {
                    controller.on_ui_changed(*ui);
                }
            },
            false,
        );
        let weak = Arc::downgrade(&controller);
        let paused_subscription = store.subscribe(
            StateProperty::PausedState,
            move |value| {
                if let (Some(controller), StateValue::Bool(paused)) = (weak.upgrade(), value) {
                    controller.on_paused_changed(*paused);
                }
            },
            false,
        );

        Self {
            store,
            controller,
            subscriptions: vec![ui_subscription, paused_subscription],
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<NavigationController> {
        &self.controller
    }

    /// Page the story opens on: the deep-linked page, else the last page of
    /// the restored history, else the first page.
    #[must_use]
    pub fn initial_page_id(&self, restored_path: &[String]) -> Option<String> {
        self.controller.with_graph(|graph| {
            let deep_link = self
                .controller
                .config()
                .initial_page
                .as_deref()
                .filter(|id| graph.contains(id));
            let restored = restored_path.last().map(String::as_str);
            deep_link
                .or(restored)
                .or_else(|| graph.first().map(|p| p.id.as_str()))
                .map(str::to_string)
        })
    }

    /// Check platform support, then lay the story out.
    ///
    /// # Errors
    ///
    /// See [`layout_unchecked`](Self::layout_unchecked).
    pub async fn layout(&self) -> NavigationResult<LayoutOutcome> {
        let platform = self.controller.config().platform;
        if !platform.supported && !platform.bot {
            tracing::warn!("platform lacks required features; showing fallback");
            return Ok(LayoutOutcome::Unsupported);
        }
        self.layout_unchecked().await
    }

    /// Lay the story out regardless of platform support.
    ///
    /// # Errors
    ///
    /// [`NavigationError::NoActivePage`] for a story without pages, plus the
    /// errors of [`NavigationController::switch_to`].
    pub async fn layout_unchecked(&self) -> NavigationResult<LayoutOutcome> {
        let record = self.controller.history().load();
        let restored = self.controller.with_graph(|graph| {
            if record.navigation_path.iter().all(|id| graph.contains(id)) {
                record.navigation_path.clone()
            } else {
                tracing::debug!("stored navigation path references unknown pages; discarding");
                Vec::new()
            }
        });
        self.store
            .dispatch(Action::SetNavigationPath(restored.clone()));

        let initial = self
            .initial_page_id(&restored)
            .ok_or(NavigationError::NoActivePage)?;
        self.controller
            .switch_to(&initial, NavigationDirection::Next)
            .await?;

        if record.attachment_page_id.as_deref() == Some(initial.as_str()) {
            self.controller.observer().on_reopen_attachment(&initial);
        }

        let loaded = self.wait_initial_content(&initial).await;
        self.controller.observer().on_story_loaded();
        self.controller.host().send(HostMessage::StoryContentLoaded);
        tracing::debug!(page_id = %initial, loaded = ?loaded, "story laid out");

        Ok(LayoutOutcome::Ready {
            initial_page: initial,
            loaded,
        })
    }

    async fn wait_initial_content(&self, page_id: &str) -> LoadOutcome {
        let timeout = self.controller.config().initial_content_load_timeout;
        let surface = Arc::clone(self.controller.surface());
        match tokio::time::timeout(timeout, surface.when_loaded(page_id)).await {
            Ok(()) => LoadOutcome::Loaded,
            Err(_) => {
                tracing::debug!(page_id, ?timeout, "initial content load timed out");
                LoadOutcome::TimedOut
            }
        }
    }

    /// Record which page's attachment is open, so it reopens next session.
    pub fn set_attachment_open(&self, page_id: Option<&str>) {
        self.controller.history().set_attachment_page_id(page_id);
    }
}

impl Drop for Story {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            self.store.unsubscribe(subscription);
        }
    }
}
