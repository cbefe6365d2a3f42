#![forbid(unsafe_code)]

//! State properties, values, and the immutable story state snapshot.
//!
//! Every piece of cross-widget state lives in a single [`StoryState`]
//! snapshot. Widgets never read the struct fields through a mutable handle:
//! they read individual properties by [`StateProperty`] key and receive
//! [`StateValue`]s, or borrow the whole snapshot through
//! [`Store::state`](crate::store::Store::state).
//!
//! # Change detection
//!
//! Each property declares a [`Comparator`]. The default is
//! [`Comparator::Identity`]: scalars compare by value, shared list snapshots
//! compare by pointer identity (a freshly built list always counts as a
//! change). Lists that are rebuilt from scratch on every mutation but often
//! carry the same contents declare [`Comparator::Structural`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerated values
// ─────────────────────────────────────────────────────────────────────────────

/// Layout family the presentation is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    /// Single full-viewport page (phones, narrow windows).
    #[default]
    Mobile,
    /// Desktop layout showing neighbouring pages as side panels.
    DesktopPanels,
    /// Desktop layout filling the viewport with the active page.
    DesktopFullbleed,
    /// Desktop layout with a single centered panel.
    DesktopOnePanel,
    /// Degraded, non-interactive layout rendering every page in a column.
    ///
    /// Entered for crawlers; never left once entered.
    Vertical,
}

/// What caused the most recent page advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvancementMode {
    /// No advancement recorded yet.
    #[default]
    NotSet,
    /// Page timer elapsed.
    AutoAdvanceTime,
    /// Page media finished playing.
    AutoAdvanceMedia,
    /// User tapped, clicked, or pressed a key.
    ManualAdvance,
    /// Automatic advancement out of an inserted ad.
    AdvanceToAds,
    /// Host viewer selected the page.
    ViewerSelectPage,
    /// A go-to-page action inside the content.
    GoToPageAction,
}

impl AdvancementMode {
    /// Wire label used in host messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotSet => "",
            Self::AutoAdvanceTime => "autoAdvanceTime",
            Self::AutoAdvanceMedia => "autoAdvanceMedia",
            Self::ManualAdvance => "manualAdvance",
            Self::AdvanceToAds => "manualAdvanceToAds",
            Self::ViewerSelectPage => "viewerSelectPage",
            Self::GoToPageAction => "goToPageAction",
        }
    }
}

impl fmt::Display for AdvancementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named preset of state overrides applied at startup for restricted hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedMode {
    /// Standalone presentation; no overrides.
    #[default]
    NotEmbedded,
    /// Minimal chrome for an embedding host that supplies its own controls.
    NameTbd,
    /// Sharing surfaces disabled.
    NoSharing,
    /// Static preview: no ads, no hints, no system buttons.
    Preview,
    /// Sharing and audio surfaces disabled.
    NoSharingNorAudioUi,
}

impl EmbedMode {
    /// Parse the numeric startup parameter (`embedMode=N`).
    ///
    /// Unknown values fall back to [`EmbedMode::NotEmbedded`].
    #[must_use]
    pub fn from_param(value: &str) -> Self {
        match value.trim() {
            "1" => Self::NameTbd,
            "2" => Self::NoSharing,
            "3" => Self::Preview,
            "4" => Self::NoSharingNorAudioUi,
            _ => Self::NotEmbedded,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Property keys
// ─────────────────────────────────────────────────────────────────────────────

/// How a property decides whether its subscribers need a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Scalars by value; shared lists by pointer identity.
    Identity,
    /// Deep comparison of the contained value.
    Structural,
}

/// Enumerable set of named state properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateProperty {
    AccessState,
    AdState,
    AdvancementMode,
    CanInsertAutomaticAd,
    CanShowAudioUi,
    CanShowNavigationOverlayHint,
    CanShowPaginationButtons,
    CanShowPreviousPageHelp,
    CanShowSharingUis,
    CanShowStoryUrlInfo,
    CanShowSystemLayerButtons,
    CurrentPageId,
    CurrentPageIndex,
    HasSidebarState,
    InfoDialogState,
    KeyboardActiveState,
    MutedState,
    NavigationPath,
    PageIds,
    PausedState,
    PreviewState,
    RtlState,
    ShareMenuState,
    SidebarState,
    StoryHasAudioState,
    StoryHasBackgroundAudioState,
    StoryHasPlaybackUiState,
    SystemUiIsVisibleState,
    UiState,
}

impl StateProperty {
    /// Every property, in notification order.
    pub const ALL: [StateProperty; 29] = [
        Self::AccessState,
        Self::AdState,
        Self::AdvancementMode,
        Self::CanInsertAutomaticAd,
        Self::CanShowAudioUi,
        Self::CanShowNavigationOverlayHint,
        Self::CanShowPaginationButtons,
        Self::CanShowPreviousPageHelp,
        Self::CanShowSharingUis,
        Self::CanShowStoryUrlInfo,
        Self::CanShowSystemLayerButtons,
        Self::CurrentPageId,
        Self::CurrentPageIndex,
        Self::HasSidebarState,
        Self::InfoDialogState,
        Self::KeyboardActiveState,
        Self::MutedState,
        Self::NavigationPath,
        Self::PageIds,
        Self::PausedState,
        Self::PreviewState,
        Self::RtlState,
        Self::ShareMenuState,
        Self::SidebarState,
        Self::StoryHasAudioState,
        Self::StoryHasBackgroundAudioState,
        Self::StoryHasPlaybackUiState,
        Self::SystemUiIsVisibleState,
        Self::UiState,
    ];

    /// Stable snake_case name of the property.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccessState => "access_state",
            Self::AdState => "ad_state",
            Self::AdvancementMode => "advancement_mode",
            Self::CanInsertAutomaticAd => "can_insert_automatic_ad",
            Self::CanShowAudioUi => "can_show_audio_ui",
            Self::CanShowNavigationOverlayHint => "can_show_navigation_overlay_hint",
            Self::CanShowPaginationButtons => "can_show_pagination_buttons",
            Self::CanShowPreviousPageHelp => "can_show_previous_page_help",
            Self::CanShowSharingUis => "can_show_sharing_uis",
            Self::CanShowStoryUrlInfo => "can_show_story_url_info",
            Self::CanShowSystemLayerButtons => "can_show_system_layer_buttons",
            Self::CurrentPageId => "current_page_id",
            Self::CurrentPageIndex => "current_page_index",
            Self::HasSidebarState => "has_sidebar_state",
            Self::InfoDialogState => "info_dialog_state",
            Self::KeyboardActiveState => "keyboard_active_state",
            Self::MutedState => "muted_state",
            Self::NavigationPath => "navigation_path",
            Self::PageIds => "page_ids",
            Self::PausedState => "paused_state",
            Self::PreviewState => "preview_state",
            Self::RtlState => "rtl_state",
            Self::ShareMenuState => "share_menu_state",
            Self::SidebarState => "sidebar_state",
            Self::StoryHasAudioState => "story_has_audio_state",
            Self::StoryHasBackgroundAudioState => "story_has_background_audio_state",
            Self::StoryHasPlaybackUiState => "story_has_playback_ui_state",
            Self::SystemUiIsVisibleState => "system_ui_is_visible_state",
            Self::UiState => "ui_state",
        }
    }

    /// Change-detection policy for this property.
    #[must_use]
    pub const fn comparator(self) -> Comparator {
        match self {
            Self::NavigationPath => Comparator::Structural,
            _ => Comparator::Identity,
        }
    }
}

impl fmt::Display for StateProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateProperty {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| StoreError::UnknownProperty(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

/// A property value as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Bool(bool),
    Index(usize),
    Text(Arc<str>),
    List(Arc<Vec<String>>),
    Ui(UiType),
    Advancement(AdvancementMode),
}

impl StateValue {
    /// Identity comparison: lists are equal only when they share storage.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Compare two values under the given policy.
    #[must_use]
    pub fn same_under(&self, other: &Self, comparator: Comparator) -> bool {
        match comparator {
            Comparator::Identity => self.identical(other),
            Comparator::Structural => self == other,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l.as_slice()),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable snapshot of every state property.
///
/// A dispatch never edits a snapshot; the reducer builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryState {
    pub access_state: bool,
    pub ad_state: bool,
    pub advancement_mode: AdvancementMode,
    pub can_insert_automatic_ad: bool,
    pub can_show_audio_ui: bool,
    pub can_show_navigation_overlay_hint: bool,
    pub can_show_pagination_buttons: bool,
    pub can_show_previous_page_help: bool,
    pub can_show_sharing_uis: bool,
    pub can_show_story_url_info: bool,
    pub can_show_system_layer_buttons: bool,
    pub current_page_id: Arc<str>,
    pub current_page_index: usize,
    pub has_sidebar_state: bool,
    pub info_dialog_state: bool,
    pub keyboard_active_state: bool,
    pub muted_state: bool,
    pub navigation_path: Arc<Vec<String>>,
    pub page_ids: Arc<Vec<String>>,
    pub paused_state: bool,
    pub preview_state: bool,
    pub rtl_state: bool,
    pub share_menu_state: bool,
    pub sidebar_state: bool,
    pub story_has_audio_state: bool,
    pub story_has_background_audio_state: bool,
    pub story_has_playback_ui_state: bool,
    pub system_ui_is_visible_state: bool,
    pub ui_state: UiType,
}

impl Default for StoryState {
    fn default() -> Self {
        Self {
            access_state: false,
            ad_state: false,
            advancement_mode: AdvancementMode::NotSet,
            can_insert_automatic_ad: true,
            can_show_audio_ui: true,
            can_show_navigation_overlay_hint: true,
            can_show_pagination_buttons: true,
            can_show_previous_page_help: true,
            can_show_sharing_uis: true,
            can_show_story_url_info: true,
            can_show_system_layer_buttons: true,
            current_page_id: Arc::from(""),
            current_page_index: 0,
            has_sidebar_state: false,
            info_dialog_state: false,
            keyboard_active_state: false,
            muted_state: true,
            navigation_path: Arc::new(Vec::new()),
            page_ids: Arc::new(Vec::new()),
            paused_state: false,
            preview_state: false,
            rtl_state: false,
            share_menu_state: false,
            sidebar_state: false,
            story_has_audio_state: false,
            story_has_background_audio_state: false,
            story_has_playback_ui_state: false,
            system_ui_is_visible_state: true,
            ui_state: UiType::Mobile,
        }
    }
}

impl StoryState {
    /// Defaults overlaid with the preset for `mode`. Preset keys win.
    #[must_use]
    pub fn with_embed_mode(mode: EmbedMode) -> Self {
        let defaults = Self::default();
        match mode {
            EmbedMode::NotEmbedded => defaults,
            EmbedMode::NameTbd => Self {
                can_insert_automatic_ad: false,
                can_show_navigation_overlay_hint: false,
                can_show_pagination_buttons: false,
                can_show_previous_page_help: true,
                can_show_system_layer_buttons: false,
                can_show_story_url_info: false,
                ..defaults
            },
            EmbedMode::NoSharing => Self {
                can_show_sharing_uis: false,
                ..defaults
            },
            EmbedMode::Preview => Self {
                can_insert_automatic_ad: false,
                can_show_navigation_overlay_hint: false,
                can_show_pagination_buttons: false,
                can_show_previous_page_help: false,
                can_show_system_layer_buttons: false,
                can_show_story_url_info: false,
                preview_state: true,
                ..defaults
            },
            EmbedMode::NoSharingNorAudioUi => Self {
                can_show_audio_ui: false,
                can_show_sharing_uis: false,
                ..defaults
            },
        }
    }

    /// Read one property as a [`StateValue`].
    #[must_use]
    pub fn get(&self, property: StateProperty) -> StateValue {
        use StateValue::{Advancement, Bool, Index, List, Text, Ui};
        match property {
            StateProperty::AccessState => Bool(self.access_state),
            StateProperty::AdState => Bool(self.ad_state),
            StateProperty::AdvancementMode => Advancement(self.advancement_mode),
            StateProperty::CanInsertAutomaticAd => Bool(self.can_insert_automatic_ad),
            StateProperty::CanShowAudioUi => Bool(self.can_show_audio_ui),
            StateProperty::CanShowNavigationOverlayHint => {
                Bool(self.can_show_navigation_overlay_hint)
            }
            StateProperty::CanShowPaginationButtons => Bool(self.can_show_pagination_buttons),
            StateProperty::CanShowPreviousPageHelp => Bool(self.can_show_previous_page_help),
            StateProperty::CanShowSharingUis => Bool(self.can_show_sharing_uis),
            StateProperty::CanShowStoryUrlInfo => Bool(self.can_show_story_url_info),
            StateProperty::CanShowSystemLayerButtons => Bool(self.can_show_system_layer_buttons),
            StateProperty::CurrentPageId => Text(Arc::clone(&self.current_page_id)),
            StateProperty::CurrentPageIndex => Index(self.current_page_index),
            StateProperty::HasSidebarState => Bool(self.has_sidebar_state),
            StateProperty::InfoDialogState => Bool(self.info_dialog_state),
            StateProperty::KeyboardActiveState => Bool(self.keyboard_active_state),
            StateProperty::MutedState => Bool(self.muted_state),
            StateProperty::NavigationPath => List(Arc::clone(&self.navigation_path)),
            StateProperty::PageIds => List(Arc::clone(&self.page_ids)),
            StateProperty::PausedState => Bool(self.paused_state),
            StateProperty::PreviewState => Bool(self.preview_state),
            StateProperty::RtlState => Bool(self.rtl_state),
            StateProperty::ShareMenuState => Bool(self.share_menu_state),
            StateProperty::SidebarState => Bool(self.sidebar_state),
            StateProperty::StoryHasAudioState => Bool(self.story_has_audio_state),
            StateProperty::StoryHasBackgroundAudioState => {
                Bool(self.story_has_background_audio_state)
            }
            StateProperty::StoryHasPlaybackUiState => Bool(self.story_has_playback_ui_state),
            StateProperty::SystemUiIsVisibleState => Bool(self.system_ui_is_visible_state),
            StateProperty::UiState => Ui(self.ui_state),
        }
    }
}
