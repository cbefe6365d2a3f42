#![forbid(unsafe_code)]

//! Pure state transition function.

use std::sync::Arc;

use crate::action::Action;
use crate::state::{StoryState, UiType};

/// Compute the state that follows `state` once `action` is applied.
///
/// Never mutates `state`. Returning a clone equal to the input means the
/// action was refused or had no effect.
#[must_use]
pub fn reduce(state: &StoryState, action: &Action) -> StoryState {
    let mut next = state.clone();
    match action {
        // Overlays that take over the viewport also pause playback.
        Action::ToggleAccess(on) => {
            if state.access_state == *on {
                return next;
            }
            next.access_state = *on;
            next.paused_state = *on;
        }
        Action::ToggleInfoDialog(on) => {
            next.info_dialog_state = *on;
            next.paused_state = *on;
        }
        Action::ToggleShareMenu(on) => {
            next.share_menu_state = *on;
            next.paused_state = *on;
        }
        Action::ToggleSidebar(on) => {
            next.sidebar_state = *on;
            next.paused_state = *on;
        }
        Action::ToggleAd(on) => next.ad_state = *on,
        Action::SetAdvancementMode(mode) => next.advancement_mode = *mode,
        Action::ToggleKeyboardActiveState(on) => next.keyboard_active_state = *on,
        Action::ToggleMuted(on) => next.muted_state = *on,
        Action::TogglePaused(on) => next.paused_state = *on,
        Action::ToggleRtl(on) => next.rtl_state = *on,
        Action::ToggleHasSidebar(on) => next.has_sidebar_state = *on,
        Action::ToggleStoryHasAudio(on) => next.story_has_audio_state = *on,
        Action::ToggleStoryHasBackgroundAudio(on) => next.story_has_background_audio_state = *on,
        Action::ToggleStoryHasPlaybackUi(on) => next.story_has_playback_ui_state = *on,
        Action::ToggleSystemUiIsVisible(on) => next.system_ui_is_visible_state = *on,
        Action::ToggleUi(ui) => {
            if state.ui_state == UiType::Vertical && *ui != UiType::Vertical {
                tracing::error!(
                    requested = ?ui,
                    "cannot leave vertical UI once entered; keeping current UI"
                );
                return next;
            }
            next.ui_state = *ui;
        }
        Action::ChangePage { id, index } => {
            next.current_page_id = Arc::from(id.as_str());
            next.current_page_index = *index;
        }
        Action::SetNavigationPath(path) => next.navigation_path = Arc::new(path.clone()),
        Action::SetPageIds(ids) => next.page_ids = Arc::new(ids.clone()),
    }
    next
}
