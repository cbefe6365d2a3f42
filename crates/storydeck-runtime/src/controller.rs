#![forbid(unsafe_code)]

//! Navigation controller: the single entry point for changing the active page.
//!
//! # Architecture
//!
//! ```text
//!  switch_to(target, direction)
//!        │
//!        ├─ unknown target ───────────────▶ Err(UnknownPage)
//!        ├─ target already active ────────▶ AlreadyActive
//!        ├─ access gate not open ─────────▶ Deferred (pending slot)
//!        ├─ transition running ───────────▶ Err(TransitionInProgress)
//!        │
//!        ├─ navigation path push/pop + persist
//!        ▼
//!  ┌─────────────────────┐ frame ┌─────────────┐ frame ┌──────────────────┐
//!  │ ImmediateVisibility │ ────▶ │ SecondaryUi │ ────▶ │ Deferred preload │
//!  └─────────────────────┘       └─────────────┘       └──────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **One transition at a time**: overlapping switches are rejected, never
//!    queued.
//! 2. **Atomic page commit**: id and index reach the store in one
//!    `ChangePage` dispatch.
//! 3. **Ads are invisible to history**: switching to an ad neither records a
//!    path entry nor moves the store's page index.
//! 4. **No lock across await**: graph and slot locks are released before any
//!    frame, authorization, or load signal is awaited.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `UnknownPage` | Bad link or typo | `error!`, nothing changes |
//! | `TransitionInProgress` | Re-entrant switch | `error!`, running switch unaffected |
//! | Storage write fails | Disk full, quota | `warn!`, in-memory path kept |
//! | Future dropped before commit | Caller cancelled | Remaining phases skipped, active page and path restored |
//! | Future dropped after commit | Caller cancelled | Deferred phase skipped, new page stays active |

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use storydeck_core::{
    Action, AdvancementMode, DistanceOptions, NavigationDirection, NavigationPath, Page,
    PageDistances, PageGraph, StateProperty, Store, UiType, page_distances,
};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::access::{AccessDecision, AccessGate, Authorizer, GateCheck};
use crate::config::StoryConfig;
use crate::error::{NavigationError, NavigationResult};
use crate::frame::{FrameScheduler, ImmediateFrames, IntervalFrames};
use crate::host::{
    HostMessage, HostMessenger, NoHost, NoopObserver, PageState, PageSurface, SWIPE_CAPABILITY,
    StoryObserver,
};
use crate::persistence::NavigationHistory;
use crate::pipeline::{TransitionPhase, TransitionPipeline};

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// How a navigation request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// All three phases ran.
    Completed,
    /// Target was already the active page.
    AlreadyActive,
    /// Target is waiting on the access gate.
    Deferred,
    /// End of the story reached; the host was asked to change documents.
    HandedToHost,
    /// End of the story reached and nothing else to do.
    AtBoundary,
}

/// Viewer-initiated page selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectPage {
    Next,
    Previous,
    /// Jump by a signed number of pages, clamped to the story.
    Delta(isize),
    Id(String),
}

/// External collaborators the controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub surface: Arc<dyn PageSurface>,
    pub host: Arc<dyn HostMessenger>,
    pub observer: Arc<dyn StoryObserver>,
    pub frames: Arc<dyn FrameScheduler>,
    pub authorizer: Option<Arc<dyn Authorizer>>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("authorizer", &self.authorizer.is_some())
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Surface only: no host, no observer, no gate, yield-only frames.
    #[must_use]
    pub fn new(surface: Arc<dyn PageSurface>) -> Self {
        Self {
            surface,
            host: Arc::new(NoHost),
            observer: Arc::new(NoopObserver),
            frames: Arc::new(ImmediateFrames),
            authorizer: None,
        }
    }

    /// Surface with timer frames at the configured interval.
    #[must_use]
    pub fn for_config(surface: Arc<dyn PageSurface>, config: &StoryConfig) -> Self {
        Self::new(surface).with_frames(Arc::new(IntervalFrames::new(config.frame_interval)))
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn HostMessenger>) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StoryObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_frames(mut self, frames: Arc<dyn FrameScheduler>) -> Self {
        self.frames = frames;
        self
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Drives page switches, navigation history, preloading, and access gating.
pub struct NavigationController {
    store: Arc<Store>,
    graph: Arc<RwLock<PageGraph>>,
    config: StoryConfig,
    surface: Arc<dyn PageSurface>,
    host: Arc<dyn HostMessenger>,
    observer: Arc<dyn StoryObserver>,
    frames: Arc<dyn FrameScheduler>,
    gate: AccessGate,
    history: NavigationHistory,
    active: Mutex<Option<String>>,
    in_transition: AtomicBool,
    deferred_preload: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationController")
            .field("active", &self.active_page_id())
            .field("in_transition", &self.is_transitioning())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Clears the transition flag when the switch ends or is dropped.
struct TransitionGuard<'a>(&'a AtomicBool);

impl<'a> TransitionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Undoes the early bookkeeping of a switch that is dropped before the
/// secondary phase commits the target to the store.
struct SwitchRollback<'a> {
    controller: &'a NavigationController,
    target: &'a str,
    previous_active: Option<String>,
    /// Path before this switch; `None` when the switch left it untouched.
    previous_path: Option<Vec<String>>,
    committed: AtomicBool,
}

impl SwitchRollback<'_> {
    fn commit(&self) {
        self.committed.store(true, Ordering::Release);
    }
}

impl Drop for SwitchRollback<'_> {
    fn drop(&mut self) {
        if self.committed.load(Ordering::Acquire) {
            return;
        }
        let controller = self.controller;
        tracing::debug!(
            page_id = self.target,
            restored = ?self.previous_active,
            "switch cancelled before commit; restoring active page"
        );
        *controller.lock_active() = self.previous_active.clone();
        if let Some(path) = self.previous_path.take() {
            controller.history.save_path(&path);
            controller.store.dispatch(Action::SetNavigationPath(path));
        }
        controller
            .surface
            .set_page_state(self.target, PageState::NotActive);
        if let Some(previous) = &self.previous_active {
            controller.surface.set_visible(previous, true);
            controller.resume_playback(previous);
        }
    }
}

impl NavigationController {
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        graph: PageGraph,
        config: StoryConfig,
        collaborators: Collaborators,
        history: NavigationHistory,
    ) -> Self {
        let Collaborators {
            surface,
            host,
            observer,
            frames,
            authorizer,
        } = collaborators;
        Self {
            store,
            graph: Arc::new(RwLock::new(graph)),
            config,
            surface,
            host,
            observer,
            frames,
            gate: AccessGate::new(authorizer),
            history,
            active: Mutex::new(None),
            in_transition: AtomicBool::new(false),
            deferred_preload: Mutex::new(None),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    #[must_use]
    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    #[must_use]
    pub fn surface(&self) -> &Arc<dyn PageSurface> {
        &self.surface
    }

    #[must_use]
    pub fn host(&self) -> &Arc<dyn HostMessenger> {
        &self.host
    }

    #[must_use]
    pub fn observer(&self) -> &Arc<dyn StoryObserver> {
        &self.observer
    }

    #[must_use]
    pub fn active_page_id(&self) -> Option<String> {
        self.lock_active().clone()
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.in_transition.load(Ordering::Acquire)
    }

    /// Run `f` against the page graph under a read lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&PageGraph) -> R) -> R {
        f(&self.read_graph())
    }

    /// Last distance applied to `page_id`.
    #[must_use]
    pub fn page_distance(&self, page_id: &str) -> Option<u32> {
        self.read_graph().page(page_id).and_then(|p| p.distance)
    }

    /// Navigation path as currently held by the store.
    #[must_use]
    pub fn navigation_path(&self) -> NavigationPath {
        NavigationPath::from(self.store.state().navigation_path.as_slice())
    }

    // ── Switching ───────────────────────────────────────────────────────

    /// Make `target` the active page.
    ///
    /// Resolves after the deferred phase has run.
    ///
    /// # Errors
    ///
    /// [`NavigationError::UnknownPage`] and
    /// [`NavigationError::TransitionInProgress`].
    pub async fn switch_to(
        &self,
        target: &str,
        direction: NavigationDirection,
    ) -> NavigationResult<SwitchOutcome> {
        self.switch(target, direction, true).await
    }

    /// Activate `target` as the origin of navigation without recording it in
    /// the navigation path. For hosts that restore a page already on screen.
    ///
    /// # Errors
    ///
    /// Same as [`switch_to`](Self::switch_to).
    pub async fn resume_at(&self, target: &str) -> NavigationResult<SwitchOutcome> {
        self.switch(target, NavigationDirection::Next, false).await
    }

    /// Spawn [`switch_to`](Self::switch_to) on the current runtime.
    /// Aborting the handle cancels the phases that have not run yet.
    pub fn spawn_switch(
        self: &Arc<Self>,
        target: impl Into<String>,
        direction: NavigationDirection,
    ) -> JoinHandle<NavigationResult<SwitchOutcome>> {
        let this = Arc::clone(self);
        let target = target.into();
        tokio::spawn(async move { this.switch_to(&target, direction).await })
    }

    async fn switch(
        &self,
        target: &str,
        direction: NavigationDirection,
        record_path: bool,
    ) -> NavigationResult<SwitchOutcome> {
        let (target_page, target_index) = {
            let graph = self.read_graph();
            match (graph.page(target), graph.index_of(target)) {
                (Some(page), Some(index)) => (page.clone(), index),
                _ => {
                    tracing::error!(page_id = target, "cannot switch to unknown page");
                    return Err(NavigationError::UnknownPage(target.to_string()));
                }
            }
        };

        if self.active_page_id().as_deref() == Some(target) {
            return Ok(SwitchOutcome::AlreadyActive);
        }

        match self.gate.check(&target_page) {
            GateCheck::Open => {}
            GateCheck::AwaitFirstCheck => {
                tracing::debug!(page_id = target, "deferring navigation until access is checked");
                self.gate.defer(target);
                return Ok(SwitchOutcome::Deferred);
            }
            GateCheck::HiddenUntilAuthorized => {
                tracing::debug!(page_id = target, "page hidden until authorized; showing access UI");
                self.store.dispatch(Action::ToggleAccess(true));
                self.gate.defer(target);
                return Ok(SwitchOutcome::Deferred);
            }
        }

        let Some(_guard) = TransitionGuard::acquire(&self.in_transition) else {
            tracing::error!(page_id = target, "switch requested while a transition is running");
            return Err(NavigationError::TransitionInProgress);
        };

        let old_id = self.lock_active().replace(target.to_string());
        let old_page = old_id.as_deref().and_then(|id| {
            let graph = self.read_graph();
            graph
                .page(id)
                .cloned()
                .zip(graph.index_of(id))
        });
        let previous_path = if !target_page.is_ad && record_path {
            let previous = self.navigation_path().into_vec();
            self.update_navigation_path(target, direction);
            Some(previous)
        } else {
            None
        };
        let rollback = SwitchRollback {
            controller: self,
            target,
            previous_active: old_id.clone(),
            previous_path,
            committed: AtomicBool::new(false),
        };
        let first_navigation = old_page.is_none();

        tracing::debug!(
            page_id = target,
            from = ?old_id,
            direction = ?direction,
            "switching page"
        );

        let pipeline = TransitionPipeline::new()
            .for_page(target)
            .phase(TransitionPhase::ImmediateVisibility, || {
                self.show_page(old_page.as_ref().map(|(p, _)| p.id.as_str()), target);
            })
            .phase(TransitionPhase::SecondaryUi, || {
                self.commit_page(old_page.as_ref(), &target_page, target_index);
                rollback.commit();
            })
            .phase(TransitionPhase::Deferred, || {
                self.preload_pages_by_distance(first_navigation);
                self.observer.on_page_active(target);
                self.observer.on_log_context(target);
            });
        pipeline.run(self.frames.as_ref()).await;

        Ok(SwitchOutcome::Completed)
    }

    fn show_page(&self, old_id: Option<&str>, target: &str) {
        let ui = self.store.state().ui_state;
        if let Some(old) = old_id {
            self.surface.set_visible(old, false);
        }
        if ui == UiType::DesktopPanels {
            self.apply_desktop_positions();
        }
        if self.store.state().paused_state {
            // Rendered paused: visible, playback held until unpaused.
            self.surface.set_visible(target, true);
        } else {
            self.surface.set_page_state(target, PageState::Playing);
        }
        if self.config.platform.needs_repaint() && ui != UiType::DesktopPanels {
            self.surface.force_repaint();
        }
    }

    fn commit_page(&self, old: Option<&(Page, usize)>, target: &Page, target_index: usize) {
        if let Some((old_page, old_index)) = old {
            self.surface.set_page_state(&old_page.id, PageState::NotActive);
            self.surface.set_visited(&old_page.id, *old_index < target_index);
            if old_page.is_ad {
                self.store
                    .dispatch(Action::SetAdvancementMode(AdvancementMode::AdvanceToAds));
            }
        }

        self.store.dispatch(Action::ToggleAd(target.is_ad));
        self.surface.set_ad_showing(target.is_ad);
        let index = if target.is_ad {
            self.store.state().current_page_index
        } else {
            if !target.is_auto_advance {
                self.surface.update_progress(&target.id);
            }
            target_index
        };
        self.store.dispatch(Action::ChangePage {
            id: target.id.clone(),
            index,
        });
    }

    fn update_navigation_path(&self, target: &str, direction: NavigationDirection) {
        let mut path = self.navigation_path();
        path.apply(target, direction);
        let entries = path.into_vec();
        self.history.save_path(&entries);
        self.store.dispatch(Action::SetNavigationPath(entries));
    }

    // ── Relative navigation ─────────────────────────────────────────────

    /// Go to the page after the active one.
    ///
    /// # Errors
    ///
    /// [`NavigationError::NoActivePage`] before the first switch, plus the
    /// errors of [`switch_to`](Self::switch_to).
    pub async fn next(&self, automatic: bool) -> NavigationResult<SwitchOutcome> {
        let active = self.active_page_id().ok_or(NavigationError::NoActivePage)?;
        let next = self
            .read_graph()
            .next_page_id(&active, automatic, self.config.branching)
            .map(str::to_string);
        match next {
            Some(id) => {
                self.store.dispatch(Action::TogglePaused(false));
                self.switch_to(&id, NavigationDirection::Next).await
            }
            None => Ok(self.on_no_next_page()),
        }
    }

    /// Go back to the page before the active one.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub async fn previous(&self) -> NavigationResult<SwitchOutcome> {
        let active = self.active_page_id().ok_or(NavigationError::NoActivePage)?;
        let path = self.navigation_path();
        let previous = self
            .read_graph()
            .previous_page_id(&active, &path)
            .map(str::to_string);
        match previous {
            Some(id) => {
                self.store.dispatch(Action::TogglePaused(false));
                self.switch_to(&id, NavigationDirection::Previous).await
            }
            None => Ok(self.on_no_previous_page()),
        }
    }

    /// Jump `delta` pages in document order, clamped to the story's ends.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub async fn switch_delta(&self, delta: isize) -> NavigationResult<SwitchOutcome> {
        let active = self.active_page_id().ok_or(NavigationError::NoActivePage)?;
        let (target, direction) = {
            let graph = self.read_graph();
            let current = graph.index_of(&active).unwrap_or(0);
            let last = graph.len().saturating_sub(1);
            let (index, direction) = if delta >= 0 {
                (
                    current.saturating_add(delta.unsigned_abs()).min(last),
                    NavigationDirection::Next,
                )
            } else {
                (
                    current.saturating_sub(delta.unsigned_abs()),
                    NavigationDirection::Previous,
                )
            };
            let target = graph
                .page_at(index)
                .map(|p| p.id.clone())
                .ok_or(NavigationError::NoActivePage)?;
            (target, direction)
        };
        self.switch_to(&target, direction).await
    }

    /// Page selection requested by the host viewer.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub async fn select_page(&self, selection: SelectPage) -> NavigationResult<SwitchOutcome> {
        self.store
            .dispatch(Action::SetAdvancementMode(AdvancementMode::ViewerSelectPage));
        match selection {
            SelectPage::Next => self.next(false).await,
            SelectPage::Previous => self.previous().await,
            SelectPage::Delta(delta) => self.switch_delta(delta).await,
            SelectPage::Id(id) => {
                let direction = {
                    let graph = self.read_graph();
                    let target = graph.index_of(&id);
                    let current = self
                        .active_page_id()
                        .and_then(|active| graph.index_of(&active));
                    match (target, current) {
                        (Some(t), Some(c)) if t <= c => NavigationDirection::Previous,
                        _ => NavigationDirection::Next,
                    }
                };
                self.switch_to(&id, direction).await
            }
        }
    }

    fn on_no_next_page(&self) -> SwitchOutcome {
        if self.host.has_capability(SWIPE_CAPABILITY) {
            self.host.send(HostMessage::SelectDocument {
                next: true,
                advancement_mode: self.store.state().advancement_mode,
            });
            return SwitchOutcome::HandedToHost;
        }
        tracing::debug!("no next page");
        SwitchOutcome::AtBoundary
    }

    fn on_no_previous_page(&self) -> SwitchOutcome {
        if self.host.has_capability(SWIPE_CAPABILITY) {
            self.host.send(HostMessage::SelectDocument {
                next: false,
                advancement_mode: self.store.state().advancement_mode,
            });
            return SwitchOutcome::HandedToHost;
        }
        if self.store.state().can_show_previous_page_help {
            self.observer.on_previous_page_help();
        }
        SwitchOutcome::AtBoundary
    }

    /// Restart the story from its first page with an empty history.
    ///
    /// # Errors
    ///
    /// [`NavigationError::NoActivePage`] for an empty story, plus the errors
    /// of [`switch_to`](Self::switch_to).
    pub async fn replay(&self) -> NavigationResult<SwitchOutcome> {
        let (first, ids) = {
            let graph = self.read_graph();
            let first = graph
                .first()
                .map(|p| p.id.clone())
                .ok_or(NavigationError::NoActivePage)?;
            (first, graph.ids())
        };
        self.history.save_path(&[]);
        self.store.dispatch(Action::SetNavigationPath(Vec::new()));

        let outcome = self.switch_to(&first, NavigationDirection::Next).await?;
        if ids.len() == 1 {
            // Same page again: restart its media and timers.
            self.surface.set_page_state(&first, PageState::NotActive);
            self.surface.set_page_state(&first, PageState::Playing);
        }
        for id in &ids {
            self.surface.set_visited(id, false);
        }
        Ok(outcome)
    }

    // ── Graph changes ───────────────────────────────────────────────────

    /// Splice `page` into the story after `before_id`.
    ///
    /// # Errors
    ///
    /// [`NavigationError::AdInsertionDisallowed`] for ads when the store
    /// forbids automatic ads; graph errors for unknown anchors or a missing
    /// next page.
    pub fn insert_page(&self, before_id: &str, page: Page) -> NavigationResult<()> {
        if page.is_ad && !self.store.state().can_insert_automatic_ad {
            tracing::debug!(page_id = %page.id, "inserting ads automatically is disallowed");
            return Err(NavigationError::AdInsertionDisallowed);
        }
        let ids = {
            let mut graph = self.write_graph();
            graph.insert_page(before_id, page, self.config.branching)?;
            graph.ids()
        };
        self.store.dispatch(Action::SetPageIds(ids));
        if self.active_page_id().is_some() {
            self.preload_pages_by_distance(false);
        }
        Ok(())
    }

    /// Show or hide a page behind the access gate.
    ///
    /// # Errors
    ///
    /// [`NavigationError::UnknownPage`] for ids not in the graph.
    pub fn set_page_hidden(&self, page_id: &str, hidden: bool) -> NavigationResult<()> {
        let mut graph = self.write_graph();
        let page = graph
            .page_mut(page_id)
            .ok_or_else(|| NavigationError::UnknownPage(page_id.to_string()))?;
        page.hidden_until_authorized = hidden;
        Ok(())
    }

    // ── Access ──────────────────────────────────────────────────────────

    /// Authorization results are in: resume the pending navigation if it is
    /// now allowed.
    ///
    /// Returns the outcome of the resumed switch, or `None` when nothing was
    /// resumed.
    ///
    /// # Errors
    ///
    /// Errors of [`switch_to`](Self::switch_to) for the resumed target.
    pub async fn apply_authorizations(&self) -> NavigationResult<Option<SwitchOutcome>> {
        self.gate.mark_first_check_completed();
        let Some(pending) = self.gate.pending() else {
            self.store.dispatch(Action::ToggleAccess(false));
            return Ok(None);
        };

        let still_hidden = self
            .read_graph()
            .page(&pending)
            .is_some_and(|p| p.hidden_until_authorized);
        if still_hidden {
            tracing::debug!(page_id = %pending, "pending page still hidden");
            return Ok(None);
        }

        match self.gate.authorize(&pending).await {
            AccessDecision::Granted => {
                if self.gate.pending().as_deref() != Some(pending.as_str()) {
                    // A newer request replaced it while authorizing.
                    return Ok(None);
                }
                let result = self.switch_to(&pending, NavigationDirection::Next).await;
                self.store.dispatch(Action::ToggleAccess(false));
                // The slot keeps the target if the switch could not start, so
                // the next authorization round retries it.
                let outcome = result?;
                self.gate.clear_pending_if(&pending);
                Ok(Some(outcome))
            }
            AccessDecision::Blocked | AccessDecision::Pending => {
                tracing::debug!(page_id = %pending, "pending navigation still blocked");
                Ok(None)
            }
        }
    }

    // ── Layout reactions ────────────────────────────────────────────────

    /// React to a UI layout change.
    pub fn on_ui_changed(&self, ui: UiType) {
        if self.active_page_id().is_none() {
            return;
        }
        match ui {
            UiType::DesktopPanels => self.apply_desktop_positions(),
            UiType::Vertical => self.preload_pages_by_distance(false),
            _ => {}
        }
    }

    /// React to the story being paused or resumed.
    pub fn on_paused_changed(&self, paused: bool) {
        let Some(active) = self.active_page_id() else {
            return;
        };
        let state = if paused {
            PageState::Paused
        } else {
            PageState::Playing
        };
        self.surface.set_page_state(&active, state);
    }

    fn resume_playback(&self, page_id: &str) {
        let state = if self.store.state().paused_state {
            PageState::Paused
        } else {
            PageState::Playing
        };
        self.surface.set_page_state(page_id, state);
    }

    fn apply_desktop_positions(&self) {
        let Some(active) = self.active_page_id() else {
            return;
        };
        let path = self.navigation_path();
        let positions = self
            .read_graph()
            .desktop_positions(&active, &path, self.config.branching);
        self.surface.set_desktop_positions(&positions);
    }

    // ── Preloading ──────────────────────────────────────────────────────

    fn is_degraded(&self) -> bool {
        self.config.platform.bot || self.store.state().ui_state == UiType::Vertical
    }

    fn compute_distances(&self, active: &str) -> Option<PageDistances> {
        let options = DistanceOptions {
            branching: self.config.branching,
            swipe_capable: self.host.has_capability(SWIPE_CAPABILITY),
            degraded: self.is_degraded(),
        };
        let path = self.navigation_path();
        match page_distances(&self.read_graph(), active, &path, options) {
            Ok(distances) => Some(distances),
            Err(err) => {
                tracing::warn!(page_id = active, error = %err, "distance calculation failed");
                None
            }
        }
    }

    /// Recompute distances from the active page and hand them to the pages.
    ///
    /// With `prioritize_active` only the active page is loaded now; the rest
    /// follow once it signals loaded, unless the current page changes first.
    pub fn preload_pages_by_distance(&self, prioritize_active: bool) {
        let Some(active) = self.active_page_id() else {
            return;
        };
        let Some(distances) = self.compute_distances(&active) else {
            return;
        };
        if !prioritize_active || self.is_degraded() {
            apply_distances(&self.graph, self.surface.as_ref(), &distances);
            return;
        }

        apply_distance(&self.graph, self.surface.as_ref(), &active, 0);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            apply_distances(&self.graph, self.surface.as_ref(), &distances);
            return;
        };

        let navigated = Arc::new(Notify::new());
        let signal = Arc::clone(&navigated);
        let subscription = self.store.subscribe(
            StateProperty::CurrentPageId,
            move |_| signal.notify_one(),
            false,
        );
        let store = Arc::clone(&self.store);
        let graph = Arc::clone(&self.graph);
        let surface = Arc::clone(&self.surface);
        let task = runtime.spawn(async move {
            tokio::select! {
                () = surface.when_loaded(&active) => {
                    apply_distances(&graph, surface.as_ref(), &distances);
                }
                () = navigated.notified() => {
                    tracing::debug!(page_id = %active, "navigated before first page loaded; skipping preload");
                }
            }
            store.unsubscribe(subscription);
        });
        // An older task still holds its subscription and exits on its own
        // once the current page changes.
        *self
            .deferred_preload
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    // ── Locks ───────────────────────────────────────────────────────────

    fn read_graph(&self) -> RwLockReadGuard<'_, PageGraph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_graph(&self) -> std::sync::RwLockWriteGuard<'_, PageGraph> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NavigationController {
    fn drop(&mut self) {
        if let Some(task) = self
            .deferred_preload
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

fn apply_distance(graph: &RwLock<PageGraph>, surface: &dyn PageSurface, id: &str, distance: u32) {
    let known = graph
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .set_distance(id, distance);
    if known {
        surface.set_distance(id, distance);
    }
}

fn apply_distances(graph: &RwLock<PageGraph>, surface: &dyn PageSurface, distances: &PageDistances) {
    {
        let mut graph = graph.write().unwrap_or_else(PoisonError::into_inner);
        for (id, distance) in distances.iter() {
            graph.set_distance(id, distance);
        }
    }
    for (id, distance) in distances.iter() {
        surface.set_distance(id, distance);
    }
}
