//! End-to-end navigation through the controller with recording collaborators.

mod common;

use std::sync::Arc;

use common::{Harness, ManualFrames, RecordingHost, linear_pages};
use storydeck_core::{Action, AdvancementMode, EmbedMode, NavigationDirection, Page, UiType};
use storydeck_runtime::{
    HostMessage, NavigationError, NavigationResult, Platform, SelectPage, StoryConfig,
    SwitchOutcome,
};
use tokio::task::JoinHandle;

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{entry} missing from {log:?}"))
}

// ============================================================================
// Three-phase pipeline
// ============================================================================

#[tokio::test]
async fn phases_are_separated_by_frames() {
    let h = Harness::new(linear_pages(3));
    h.controller.resume_at("p0").await.unwrap();
    h.clear_log();

    let outcome = h
        .controller
        .switch_to("p1", NavigationDirection::Next)
        .await
        .unwrap();
    assert_eq!(outcome, SwitchOutcome::Completed);

    let log = h.log();
    let hide_old = position(&log, "visible:p0:false");
    let play_new = position(&log, "state:p1:Playing");
    let deactivate_old = position(&log, "state:p0:NotActive");
    let progress = position(&log, "progress:p1");
    let first_distance = position(&log, "distance:p1:0");
    let frames: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, e)| *e == "frame")
        .map(|(i, _)| i)
        .collect();

    assert_eq!(frames.len(), 2, "{log:?}");
    assert!(hide_old < play_new);
    assert!(play_new < frames[0]);
    assert!(frames[0] < deactivate_old && deactivate_old < frames[1]);
    assert!(progress < frames[1]);
    assert!(frames[1] < first_distance);
    assert!(log.contains(&"visited:p0:true".to_string()));
}

#[tokio::test]
async fn store_commits_id_and_index_together() {
    let h = Harness::new(linear_pages(3));
    h.controller.resume_at("p0").await.unwrap();
    h.controller
        .switch_to("p2", NavigationDirection::Next)
        .await
        .unwrap();

    let state = h.store.state();
    assert_eq!(&*state.current_page_id, "p2");
    assert_eq!(state.current_page_index, 2);
    assert_eq!(
        h.observer.events(),
        vec!["active:p0", "log_context:p0", "active:p2", "log_context:p2"]
    );
}

#[tokio::test]
async fn paused_story_only_reveals_target() {
    let h = Harness::new(linear_pages(2));
    h.controller.resume_at("p0").await.unwrap();
    h.store.dispatch(Action::TogglePaused(true));
    h.clear_log();

    h.controller
        .switch_to("p1", NavigationDirection::Next)
        .await
        .unwrap();
    let log = h.log();
    assert!(log.contains(&"visible:p1:true".to_string()));
    assert!(!log.contains(&"state:p1:Playing".to_string()));
}

#[tokio::test]
async fn safari_forces_repaint_outside_desktop_panels() {
    let config = StoryConfig::default().with_platform(Platform {
        safari: true,
        ..Platform::default()
    });
    let h = Harness::build(linear_pages(2), config, Arc::new(RecordingHost::default()), None);
    h.controller.resume_at("p0").await.unwrap();
    assert!(h.log().contains(&"repaint".to_string()));

    h.store.dispatch(Action::ToggleUi(UiType::DesktopPanels));
    h.clear_log();
    h.controller
        .switch_to("p1", NavigationDirection::Next)
        .await
        .unwrap();
    assert!(!h.log().contains(&"repaint".to_string()));
}

// ============================================================================
// Reentrancy and cancellation
// ============================================================================

#[tokio::test]
async fn overlapping_switch_is_rejected() {
    let frames = Arc::new(ManualFrames::default());
    let h = Harness::build_with_frames(
        linear_pages(3),
        StoryConfig::default(),
        Arc::new(RecordingHost::default()),
        None,
        frames.clone(),
    );

    let running = h.controller.spawn_switch("p1", NavigationDirection::Next);
    settle().await;
    assert!(h.controller.is_transitioning());

    let err = h
        .controller
        .switch_to("p2", NavigationDirection::Next)
        .await
        .unwrap_err();
    assert_eq!(err, NavigationError::TransitionInProgress);

    frames.release();
    settle().await;
    frames.release();
    settle().await;

    assert_eq!(running.await.unwrap().unwrap(), SwitchOutcome::Completed);
    assert!(!h.controller.is_transitioning());
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p1"));
    assert_eq!(h.path(), vec!["p1"]);
}

/// Release both frame boundaries of a parked switch and collect its outcome.
async fn finish(
    frames: &ManualFrames,
    handle: JoinHandle<NavigationResult<SwitchOutcome>>,
) -> SwitchOutcome {
    for _ in 0..2 {
        settle().await;
        frames.release();
    }
    settle().await;
    handle.await.unwrap().unwrap()
}

fn manual_harness(pages: usize) -> (Harness, Arc<ManualFrames>) {
    let frames = Arc::new(ManualFrames::default());
    let h = Harness::build_with_frames(
        linear_pages(pages),
        StoryConfig::default(),
        Arc::new(RecordingHost::default()),
        None,
        frames.clone(),
    );
    (h, frames)
}

#[tokio::test]
async fn aborted_switch_restores_previous_page() {
    let (h, frames) = manual_harness(3);
    let opening = h.controller.spawn_switch("p0", NavigationDirection::Next);
    assert_eq!(finish(&frames, opening).await, SwitchOutcome::Completed);
    h.clear_log();

    let running = h.controller.spawn_switch("p1", NavigationDirection::Next);
    settle().await;
    assert!(h.log().contains(&"state:p1:Playing".to_string()));
    assert_eq!(h.path(), vec!["p0", "p1"]);

    running.abort();
    settle().await;

    assert!(!h.controller.is_transitioning());
    assert!(!h.log().contains(&"progress:p1".to_string()));
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p0"));
    assert_eq!(&*h.store.state().current_page_id, "p0");
    assert_eq!(h.path(), vec!["p0"]);
    assert_eq!(h.controller.history().snapshot().navigation_path, vec!["p0"]);
    let log = h.log();
    let stopped = position(&log, "state:p1:NotActive");
    let shown = position(&log, "visible:p0:true");
    let resumed = position(&log, "state:p0:Playing");
    assert!(stopped < shown && shown < resumed);

    let retry = h.controller.spawn_switch("p1", NavigationDirection::Next);
    assert_eq!(finish(&frames, retry).await, SwitchOutcome::Completed);
    assert_eq!(&*h.store.state().current_page_id, "p1");
    assert_eq!(h.path(), vec!["p0", "p1"]);
}

#[tokio::test]
async fn aborted_first_switch_leaves_no_active_page() {
    let (h, frames) = manual_harness(2);
    let running = h.controller.spawn_switch("p1", NavigationDirection::Next);
    settle().await;
    running.abort();
    settle().await;

    assert_eq!(h.controller.active_page_id(), None);
    assert!(h.path().is_empty());
    assert_eq!(&*h.store.state().current_page_id, "");

    let retry = h.controller.spawn_switch("p1", NavigationDirection::Next);
    assert_eq!(finish(&frames, retry).await, SwitchOutcome::Completed);
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p1"));
}

#[tokio::test]
async fn switch_aborted_after_commit_keeps_new_page() {
    let (h, frames) = manual_harness(2);
    let opening = h.controller.spawn_switch("p0", NavigationDirection::Next);
    finish(&frames, opening).await;

    let running = h.controller.spawn_switch("p1", NavigationDirection::Next);
    settle().await;
    frames.release();
    settle().await;
    assert!(h.log().contains(&"progress:p1".to_string()));

    running.abort();
    settle().await;

    assert!(!h.controller.is_transitioning());
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p1"));
    assert_eq!(&*h.store.state().current_page_id, "p1");
    assert_eq!(h.path(), vec!["p0", "p1"]);
    assert!(!h.observer.events().contains(&"active:p1".to_string()));
}

#[tokio::test]
async fn unknown_target_changes_nothing() {
    let h = Harness::new(linear_pages(2));
    h.controller.resume_at("p0").await.unwrap();
    h.clear_log();

    let err = h
        .controller
        .switch_to("nope", NavigationDirection::Next)
        .await
        .unwrap_err();
    assert_eq!(err, NavigationError::UnknownPage("nope".into()));
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p0"));
    assert!(h.log().is_empty());
}

#[tokio::test]
async fn switching_to_active_page_is_a_no_op() {
    let h = Harness::new(linear_pages(2));
    h.controller.resume_at("p0").await.unwrap();
    h.clear_log();
    let outcome = h
        .controller
        .switch_to("p0", NavigationDirection::Next)
        .await
        .unwrap();
    assert_eq!(outcome, SwitchOutcome::AlreadyActive);
    assert!(h.log().is_empty());
}

// ============================================================================
// Navigation path and distances
// ============================================================================

#[tokio::test]
async fn three_page_story_without_swipe_wraps_from_last_page() {
    let h = Harness::new(linear_pages(3));
    h.controller.resume_at("p0").await.unwrap();
    h.controller.next(false).await.unwrap();
    h.controller.next(false).await.unwrap();

    assert_eq!(h.path(), vec!["p1", "p2"]);
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p2"));
    assert_eq!(h.surface.distance("p2"), Some(0));
    assert_eq!(h.surface.distance("p1"), Some(1));
    assert_eq!(h.surface.distance("p0"), Some(1));
    assert_eq!(h.controller.page_distance("p0"), Some(1));
}

#[tokio::test]
async fn three_page_story_with_swipe_keeps_bfs_distance() {
    let h = Harness::build(
        linear_pages(3),
        StoryConfig::default(),
        RecordingHost::with_swipe(),
        None,
    );
    h.controller.resume_at("p0").await.unwrap();
    h.controller.next(false).await.unwrap();
    h.controller.next(false).await.unwrap();

    assert_eq!(h.path(), vec!["p1", "p2"]);
    assert_eq!(h.surface.distance("p0"), Some(2));
}

#[tokio::test]
async fn previous_pops_the_path() {
    let h = Harness::new(linear_pages(4));
    h.controller.resume_at("p0").await.unwrap();
    h.controller
        .switch_to("p3", NavigationDirection::Next)
        .await
        .unwrap();
    h.controller
        .switch_to("p1", NavigationDirection::Next)
        .await
        .unwrap();
    assert_eq!(h.path(), vec!["p3", "p1"]);

    h.controller.previous().await.unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p3"));
    assert_eq!(h.path(), vec!["p3"]);
    assert_eq!(h.controller.history().snapshot().navigation_path, vec!["p3"]);
}

#[tokio::test]
async fn first_navigation_defers_preload_until_loaded() {
    let h = Harness::new(linear_pages(3));
    h.controller.resume_at("p0").await.unwrap();
    settle().await;
    assert_eq!(h.surface.distances().len(), 1);
    assert_eq!(h.surface.distance("p0"), Some(0));

    h.surface.mark_loaded("p0");
    settle().await;
    assert_eq!(h.surface.distance("p1"), Some(1));
    assert_eq!(h.surface.distance("p2"), Some(2));
}

#[tokio::test]
async fn deferred_preload_is_skipped_after_navigation() {
    let h = Harness::new(linear_pages(4));
    h.controller.resume_at("p0").await.unwrap();
    h.controller
        .switch_to("p2", NavigationDirection::Next)
        .await
        .unwrap();
    settle().await;
    let after_switch = h.surface.distances();

    h.surface.mark_loaded("p0");
    settle().await;
    assert_eq!(h.surface.distances(), after_switch);
    assert_eq!(h.surface.distance("p2"), Some(0));
    assert_eq!(h.store.subscription_count(), 0);
}

#[tokio::test]
async fn vertical_ui_marks_every_page_near() {
    let h = Harness::new(linear_pages(4));
    h.store.dispatch(Action::ToggleUi(UiType::Vertical));
    h.controller.resume_at("p0").await.unwrap();
    for id in ["p0", "p1", "p2", "p3"] {
        assert_eq!(h.surface.distance(id), Some(0), "{id}");
    }
}

#[tokio::test]
async fn desktop_panels_receive_positions() {
    let h = Harness::new(linear_pages(5));
    h.controller.resume_at("p0").await.unwrap();
    h.controller
        .switch_to("p2", NavigationDirection::Next)
        .await
        .unwrap();
    h.clear_log();

    h.controller.on_ui_changed(UiType::DesktopPanels);
    assert_eq!(h.log(), vec!["positions:p2=0,p1=-1,p0=-2,p3=1,p4=2"]);
}

// ============================================================================
// Relative navigation and boundaries
// ============================================================================

#[tokio::test]
async fn relative_navigation_needs_an_active_page() {
    let h = Harness::new(linear_pages(2));
    assert_eq!(h.controller.next(false).await, Err(NavigationError::NoActivePage));
    assert_eq!(h.controller.previous().await, Err(NavigationError::NoActivePage));
}

#[tokio::test]
async fn boundaries_hand_off_to_swipe_host() {
    let h = Harness::build(
        linear_pages(2),
        StoryConfig::default(),
        RecordingHost::with_swipe(),
        None,
    );
    h.controller.resume_at("p0").await.unwrap();

    assert_eq!(h.controller.previous().await.unwrap(), SwitchOutcome::HandedToHost);
    h.controller.next(false).await.unwrap();
    assert_eq!(h.controller.next(true).await.unwrap(), SwitchOutcome::HandedToHost);

    assert_eq!(
        h.host.sent(),
        vec![
            HostMessage::SelectDocument {
                next: false,
                advancement_mode: AdvancementMode::NotSet,
            },
            HostMessage::SelectDocument {
                next: true,
                advancement_mode: AdvancementMode::NotSet,
            },
        ]
    );
}

#[tokio::test]
async fn first_page_without_host_shows_previous_help() {
    let h = Harness::new(linear_pages(2));
    h.controller.resume_at("p0").await.unwrap();
    assert_eq!(h.controller.previous().await.unwrap(), SwitchOutcome::AtBoundary);
    assert!(h.observer.events().contains(&"previous_page_help".to_string()));
    assert!(h.host.sent().is_empty());
}

#[tokio::test]
async fn select_page_records_viewer_mode() {
    let h = Harness::new(linear_pages(5));
    h.controller.resume_at("p0").await.unwrap();

    h.controller.select_page(SelectPage::Delta(10)).await.unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p4"));
    assert_eq!(h.store.state().advancement_mode, AdvancementMode::ViewerSelectPage);

    h.controller.select_page(SelectPage::Delta(-2)).await.unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p2"));

    h.controller
        .select_page(SelectPage::Id("p1".into()))
        .await
        .unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p1"));
    assert_eq!(h.path(), vec!["p1"]);
}

#[tokio::test]
async fn replay_restarts_from_first_page() {
    let h = Harness::new(linear_pages(3));
    h.controller.resume_at("p0").await.unwrap();
    h.controller.next(false).await.unwrap();
    h.controller.next(false).await.unwrap();
    h.clear_log();

    h.controller.replay().await.unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p0"));
    assert_eq!(h.path(), vec!["p0"]);
    let log = h.log();
    for id in ["p0", "p1", "p2"] {
        assert!(log.contains(&format!("visited:{id}:false")), "{id}");
    }
}

// ============================================================================
// Ads
// ============================================================================

#[tokio::test]
async fn inserted_ad_is_invisible_to_history_and_index() {
    let h = Harness::new(linear_pages(3));
    h.controller.resume_at("p0").await.unwrap();
    h.controller.insert_page("p0", Page::ad("ad-1")).unwrap();
    assert_eq!(
        h.store.state().page_ids.as_ref(),
        &vec!["p0".to_string(), "ad-1".into(), "p1".into(), "p2".into()]
    );

    h.controller.next(false).await.unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("ad-1"));
    assert!(h.store.state().ad_state);
    assert_eq!(h.store.state().current_page_index, 0);
    assert!(h.path().is_empty());

    h.controller.next(false).await.unwrap();
    assert_eq!(h.controller.active_page_id().as_deref(), Some("p1"));
    assert!(!h.store.state().ad_state);
    assert_eq!(h.store.state().current_page_index, 2);
    assert_eq!(h.store.state().advancement_mode, AdvancementMode::AdvanceToAds);
    assert_eq!(h.path(), vec!["p1"]);
}

#[tokio::test]
async fn preview_embed_refuses_automatic_ads() {
    let config = StoryConfig::default().with_embed_mode(EmbedMode::Preview);
    let h = Harness::build(linear_pages(2), config, Arc::new(RecordingHost::default()), None);
    assert_eq!(
        h.controller.insert_page("p0", Page::ad("ad-1")),
        Err(NavigationError::AdInsertionDisallowed)
    );
    assert_eq!(h.controller.with_graph(|g| g.len()), 2);
}

#[tokio::test]
async fn ad_after_final_page_is_rejected() {
    let h = Harness::new(linear_pages(2));
    let err = h.controller.insert_page("p1", Page::ad("ad-1")).unwrap_err();
    assert!(matches!(err, NavigationError::Graph(_)));
    assert_eq!(h.controller.with_graph(|g| g.len()), 2);
}
