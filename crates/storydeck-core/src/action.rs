#![forbid(unsafe_code)]

//! Closed set of store actions.
//!
//! Widgets never write state directly: they describe a change as an
//! [`Action`] and hand it to [`Store::dispatch`](crate::store::Store::dispatch).
//! The string-keyed surface ([`Action::from_name`]) exists for hosts that
//! forward actions by name; everything inside the workspace uses the enum.

use std::fmt;

use crate::error::StoreError;
use crate::state::{AdvancementMode, StateValue, UiType};

/// A requested state mutation with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show or hide the access (paywall/consent) UI. Also pauses the story.
    ToggleAccess(bool),
    /// An ad page became active or inactive.
    ToggleAd(bool),
    SetAdvancementMode(AdvancementMode),
    /// Open or close the info dialog. Also pauses the story.
    ToggleInfoDialog(bool),
    ToggleKeyboardActiveState(bool),
    ToggleMuted(bool),
    TogglePaused(bool),
    ToggleRtl(bool),
    /// Open or close the share menu. Also pauses the story.
    ToggleShareMenu(bool),
    /// Open or close the sidebar. Also pauses the story.
    ToggleSidebar(bool),
    ToggleHasSidebar(bool),
    ToggleStoryHasAudio(bool),
    ToggleStoryHasBackgroundAudio(bool),
    ToggleStoryHasPlaybackUi(bool),
    ToggleSystemUiIsVisible(bool),
    ToggleUi(UiType),
    /// Commit the active page id and index together.
    ChangePage { id: String, index: usize },
    SetNavigationPath(Vec<String>),
    SetPageIds(Vec<String>),
}

impl Action {
    /// Stable name used by the string-keyed surface.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ToggleAccess(_) => "toggle_access",
            Self::ToggleAd(_) => "toggle_ad",
            Self::SetAdvancementMode(_) => "set_advancement_mode",
            Self::ToggleInfoDialog(_) => "toggle_info_dialog",
            Self::ToggleKeyboardActiveState(_) => "toggle_keyboard_active_state",
            Self::ToggleMuted(_) => "toggle_muted",
            Self::TogglePaused(_) => "toggle_paused",
            Self::ToggleRtl(_) => "toggle_rtl",
            Self::ToggleShareMenu(_) => "toggle_share_menu",
            Self::ToggleSidebar(_) => "toggle_sidebar",
            Self::ToggleHasSidebar(_) => "toggle_has_sidebar",
            Self::ToggleStoryHasAudio(_) => "toggle_story_has_audio",
            Self::ToggleStoryHasBackgroundAudio(_) => "toggle_story_has_background_audio",
            Self::ToggleStoryHasPlaybackUi(_) => "toggle_story_has_playback_ui",
            Self::ToggleSystemUiIsVisible(_) => "toggle_system_ui_is_visible",
            Self::ToggleUi(_) => "toggle_ui",
            Self::ChangePage { .. } => "change_page",
            Self::SetNavigationPath(_) => "set_navigation_path",
            Self::SetPageIds(_) => "set_page_ids",
        }
    }

    /// Build an action from its name and a payload value.
    ///
    /// Unknown names and payloads of the wrong shape are logged on the
    /// developer channel and yield `None`; the store is left untouched.
    /// `change_page` is not reachable here because it carries two fields.
    #[must_use]
    pub fn from_name(name: &str, payload: &StateValue) -> Option<Self> {
        match Self::try_from_name(name, payload) {
            Ok(action) => Some(action),
            Err(err) => {
                tracing::error!(action = name, error = %err, "rejected named action");
                None
            }
        }
    }

    fn try_from_name(name: &str, payload: &StateValue) -> Result<Self, StoreError> {
        let mismatch = || StoreError::UnknownAction(format!("{name} with payload {payload:?}"));
        let flag = || payload.as_bool().ok_or_else(mismatch);
        let list = || {
            payload
                .as_list()
                .map(<[String]>::to_vec)
                .ok_or_else(mismatch)
        };
        Ok(match name {
            "toggle_access" => Self::ToggleAccess(flag()?),
            "toggle_ad" => Self::ToggleAd(flag()?),
            "set_advancement_mode" => match payload {
                StateValue::Advancement(mode) => Self::SetAdvancementMode(*mode),
                _ => return Err(mismatch()),
            },
            "toggle_info_dialog" => Self::ToggleInfoDialog(flag()?),
            "toggle_keyboard_active_state" => Self::ToggleKeyboardActiveState(flag()?),
            "toggle_muted" => Self::ToggleMuted(flag()?),
            "toggle_paused" => Self::TogglePaused(flag()?),
            "toggle_rtl" => Self::ToggleRtl(flag()?),
            "toggle_share_menu" => Self::ToggleShareMenu(flag()?),
            "toggle_sidebar" => Self::ToggleSidebar(flag()?),
            "toggle_has_sidebar" => Self::ToggleHasSidebar(flag()?),
            "toggle_story_has_audio" => Self::ToggleStoryHasAudio(flag()?),
            "toggle_story_has_background_audio" => Self::ToggleStoryHasBackgroundAudio(flag()?),
            "toggle_story_has_playback_ui" => Self::ToggleStoryHasPlaybackUi(flag()?),
            "toggle_system_ui_is_visible" => Self::ToggleSystemUiIsVisible(flag()?),
            "toggle_ui" => match payload {
                StateValue::Ui(ui) => Self::ToggleUi(*ui),
                _ => return Err(mismatch()),
            },
            "set_navigation_path" => Self::SetNavigationPath(list()?),
            "set_page_ids" => Self::SetPageIds(list()?),
            _ => return Err(StoreError::UnknownAction(name.to_string())),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
