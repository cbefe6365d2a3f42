//! Recording collaborators shared by the runtime integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storydeck_core::{Page, PageGraph, Store};
use storydeck_runtime::{
    AccessError, Authorizer, Collaborators, FrameScheduler, HostMessage, HostMessenger,
    NavigationController, NavigationHistory, PageState, PageSurface, StoryConfig, StoryObserver,
};
use tokio::sync::Notify;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

// ============================================================================
// Surface
// ============================================================================

pub struct RecordingSurface {
    log: Log,
    loaded: Mutex<HashSet<String>>,
    loaded_signal: Notify,
    distances: Mutex<HashMap<String, u32>>,
}

impl RecordingSurface {
    pub fn new(log: Log) -> Arc<Self> {
        Arc::new(Self {
            log,
            loaded: Mutex::new(HashSet::new()),
            loaded_signal: Notify::new(),
            distances: Mutex::new(HashMap::new()),
        })
    }

    pub fn mark_loaded(&self, page_id: &str) {
        self.loaded.lock().unwrap().insert(page_id.to_string());
        self.loaded_signal.notify_waiters();
    }

    pub fn distances(&self) -> HashMap<String, u32> {
        self.distances.lock().unwrap().clone()
    }

    pub fn distance(&self, page_id: &str) -> Option<u32> {
        self.distances.lock().unwrap().get(page_id).copied()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl PageSurface for RecordingSurface {
    fn set_page_state(&self, page_id: &str, state: PageState) {
        self.push(format!("state:{page_id}:{state:?}"));
    }

    fn set_visible(&self, page_id: &str, visible: bool) {
        self.push(format!("visible:{page_id}:{visible}"));
    }

    fn set_visited(&self, page_id: &str, visited: bool) {
        self.push(format!("visited:{page_id}:{visited}"));
    }

    fn set_desktop_positions(&self, positions: &[(String, i8)]) {
        let rendered: Vec<String> = positions.iter().map(|(id, p)| format!("{id}={p}")).collect();
        self.push(format!("positions:{}", rendered.join(",")));
    }

    fn set_distance(&self, page_id: &str, distance: u32) {
        self.distances
            .lock()
            .unwrap()
            .insert(page_id.to_string(), distance);
        self.push(format!("distance:{page_id}:{distance}"));
    }

    fn set_ad_showing(&self, showing: bool) {
        self.push(format!("ad_showing:{showing}"));
    }

    fn update_progress(&self, page_id: &str) {
        self.push(format!("progress:{page_id}"));
    }

    fn force_repaint(&self) {
        self.push("repaint".to_string());
    }

    async fn when_loaded(&self, page_id: &str) {
        loop {
            let signal = self.loaded_signal.notified();
            if self.loaded.lock().unwrap().contains(page_id) {
                return;
            }
            signal.await;
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Yields once per frame and records the boundary in the shared log.
pub struct LoggedFrames(pub Log);

#[async_trait]
impl FrameScheduler for LoggedFrames {
    async fn next_frame(&self) {
        tokio::task::yield_now().await;
        self.0.lock().unwrap().push("frame".to_string());
    }
}

/// Frames that only advance when the test releases them.
#[derive(Default)]
pub struct ManualFrames {
    release: Notify,
}

impl ManualFrames {
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl FrameScheduler for ManualFrames {
    async fn next_frame(&self) {
        self.release.notified().await;
    }
}

// ============================================================================
// Host and observer
// ============================================================================

#[derive(Default)]
pub struct RecordingHost {
    pub swipe: bool,
    pub sent: Mutex<Vec<HostMessage>>,
}

impl RecordingHost {
    pub fn with_swipe() -> Arc<Self> {
        Arc::new(Self {
            swipe: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<HostMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl HostMessenger for RecordingHost {
    fn has_capability(&self, capability: &str) -> bool {
        capability == "swipe" && self.swipe
    }

    fn send(&self, message: HostMessage) {
        self.sent.lock().unwrap().push(message);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.events.lock().unwrap().push(entry);
    }
}

impl StoryObserver for RecordingObserver {
    fn on_page_active(&self, page_id: &str) {
        self.push(format!("active:{page_id}"));
    }

    fn on_log_context(&self, page_id: &str) {
        self.push(format!("log_context:{page_id}"));
    }

    fn on_story_loaded(&self) {
        self.push("story_loaded".to_string());
    }

    fn on_previous_page_help(&self) {
        self.push("previous_page_help".to_string());
    }

    fn on_reopen_attachment(&self, page_id: &str) {
        self.push(format!("reopen_attachment:{page_id}"));
    }
}

// ============================================================================
// Authorizer
// ============================================================================

#[derive(Default)]
pub struct ScriptedAuthorizer {
    pub completed: AtomicBool,
    pub grant: AtomicBool,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedAuthorizer {
    pub fn granting() -> Arc<Self> {
        let auth = Self::default();
        auth.grant.store(true, Ordering::SeqCst);
        Arc::new(auth)
    }
}

#[async_trait]
impl Authorizer for ScriptedAuthorizer {
    fn first_check_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    async fn check_authorization(&self, _page_id: &str) -> Result<bool, AccessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AccessError::Request("entitlements unreachable".into()));
        }
        Ok(self.grant.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn linear_pages(n: usize) -> Vec<Page> {
    (0..n).map(|i| Page::new(format!("p{i}"))).collect()
}

pub struct Harness {
    pub controller: Arc<NavigationController>,
    pub store: Arc<Store>,
    pub surface: Arc<RecordingSurface>,
    pub host: Arc<RecordingHost>,
    pub observer: Arc<RecordingObserver>,
    pub log: Log,
}

impl Harness {
    pub fn new(pages: Vec<Page>) -> Self {
        Self::build(pages, StoryConfig::default(), Arc::new(RecordingHost::default()), None)
    }

    pub fn build(
        pages: Vec<Page>,
        config: StoryConfig,
        host: Arc<RecordingHost>,
        authorizer: Option<Arc<ScriptedAuthorizer>>,
    ) -> Self {
        let log = new_log();
        let frames = Arc::new(LoggedFrames(Arc::clone(&log)));
        Self::assemble(pages, config, host, authorizer, frames, log)
    }

    pub fn build_with_frames(
        pages: Vec<Page>,
        config: StoryConfig,
        host: Arc<RecordingHost>,
        authorizer: Option<Arc<ScriptedAuthorizer>>,
        frames: Arc<dyn FrameScheduler>,
    ) -> Self {
        Self::assemble(pages, config, host, authorizer, frames, new_log())
    }

    fn assemble(
        pages: Vec<Page>,
        config: StoryConfig,
        host: Arc<RecordingHost>,
        authorizer: Option<Arc<ScriptedAuthorizer>>,
        frames: Arc<dyn FrameScheduler>,
        log: Log,
    ) -> Self {
        let surface = RecordingSurface::new(Arc::clone(&log));
        let observer = Arc::new(RecordingObserver::default());
        let store = Arc::new(Store::with_embed_mode(config.embed_mode));

        let mut collaborators = Collaborators::new(surface.clone())
            .with_host(host.clone())
            .with_observer(observer.clone())
            .with_frames(frames);
        if let Some(authorizer) = authorizer {
            collaborators = collaborators.with_authorizer(authorizer);
        }

        let history = NavigationHistory::in_memory(config.persistence.namespace.clone());
        let controller = Arc::new(NavigationController::new(
            Arc::clone(&store),
            PageGraph::new(pages),
            config,
            collaborators,
            history,
        ));
        Self {
            controller,
            store,
            surface,
            host,
            observer,
            log,
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn path(&self) -> Vec<String> {
        self.store.state().navigation_path.as_ref().clone()
    }
}
