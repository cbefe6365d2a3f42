#![forbid(unsafe_code)]

//! Story configuration.
//!
//! # Env Var Contract
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `STORYDECK_EMBED` | Embed mode number (0-4) | `0` |
//! | `STORYDECK_BRANCHING` | `1`/`true` enables branching navigation | off |
//! | `STORYDECK_LOAD_TIMEOUT_MS` | Initial content load timeout | `8000` |
//! | `STORYDECK_FRAME_INTERVAL_MS` | Frame interval for [`IntervalFrames`](crate::frame::IntervalFrames) | `16` |
//!
//! Unparseable values fall back to the default and log a warning.

use std::env;
use std::time::Duration;

use storydeck_core::{EmbedMode, UiType};

/// Time after which the story is declared loaded even if its first page
/// never signalled.
pub const INITIAL_CONTENT_LOAD_TIMEOUT: Duration = Duration::from_millis(8000);

/// Default frame interval (about 60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Rendering engine traits detected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// WebKit desktop engine; needs a forced repaint after page switches.
    pub safari: bool,
    /// iOS engine; needs a forced repaint after page switches.
    pub ios: bool,
    /// Crawler; everything renders at once in the vertical UI.
    pub bot: bool,
    /// Engine supports the features the presentation needs.
    pub supported: bool,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            safari: false,
            ios: false,
            bot: false,
            supported: true,
        }
    }
}

impl Platform {
    #[must_use]
    pub fn needs_repaint(&self) -> bool {
        self.safari || self.ios
    }
}

/// Where navigation history is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    /// Key under which this story's record is stored.
    pub namespace: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            namespace: "storydeck::navigation".to_string(),
        }
    }
}

impl PersistenceConfig {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

/// Configuration for one story instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryConfig {
    pub embed_mode: EmbedMode,
    /// Honor authored `advance_to` links and go-to-page branch targets.
    pub branching: bool,
    pub platform: Platform,
    /// Layout the story starts in. Crawlers always get [`UiType::Vertical`].
    pub ui: UiType,
    pub initial_content_load_timeout: Duration,
    pub frame_interval: Duration,
    /// Page requested through the URL fragment (`#page=<id>`).
    pub initial_page: Option<String>,
    pub persistence: PersistenceConfig,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            embed_mode: EmbedMode::NotEmbedded,
            branching: false,
            platform: Platform::default(),
            ui: UiType::Mobile,
            initial_content_load_timeout: INITIAL_CONTENT_LOAD_TIMEOUT,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            initial_page: None,
            persistence: PersistenceConfig::default(),
        }
    }
}

impl StoryConfig {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read overrides through `lookup` instead of the process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("STORYDECK_EMBED") {
            config.embed_mode = EmbedMode::from_param(&value);
        }
        if let Some(value) = lookup("STORYDECK_BRANCHING") {
            config.branching = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(ms) = parse_millis(&lookup, "STORYDECK_LOAD_TIMEOUT_MS") {
            config.initial_content_load_timeout = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "STORYDECK_FRAME_INTERVAL_MS") {
            config.frame_interval = ms;
        }
        config
    }

    #[must_use]
    pub fn with_embed_mode(mut self, mode: EmbedMode) -> Self {
        self.embed_mode = mode;
        self
    }

    #[must_use]
    pub fn with_branching(mut self, branching: bool) -> Self {
        self.branching = branching;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_ui(mut self, ui: UiType) -> Self {
        self.ui = ui;
        self
    }

    #[must_use]
    pub fn with_initial_content_load_timeout(mut self, timeout: Duration) -> Self {
        self.initial_content_load_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    #[must_use]
    pub fn with_initial_page(mut self, page_id: impl Into<String>) -> Self {
        self.initial_page = Some(page_id.into());
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = persistence;
        self
    }

    /// UI the story actually starts in.
    #[must_use]
    pub fn effective_ui(&self) -> UiType {
        if self.platform.bot {
            UiType::Vertical
        } else {
            self.ui
        }
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            tracing::warn!(key, value = %raw, error = %err, "ignoring invalid duration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = StoryConfig::from_lookup(|_| None);
        assert_eq!(config, StoryConfig::default());
        assert_eq!(config.initial_content_load_timeout, Duration::from_millis(8000));
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = StoryConfig::from_lookup(lookup(&[
            ("STORYDECK_EMBED", "2"),
            ("STORYDECK_BRANCHING", "true"),
            ("STORYDECK_LOAD_TIMEOUT_MS", "250"),
            ("STORYDECK_FRAME_INTERVAL_MS", "8"),
        ]));
        assert_eq!(config.embed_mode, EmbedMode::NoSharing);
        assert!(config.branching);
        assert_eq!(config.initial_content_load_timeout, Duration::from_millis(250));
        assert_eq!(config.frame_interval, Duration::from_millis(8));
    }

    #[test]
    fn invalid_durations_keep_defaults() {
        let config = StoryConfig::from_lookup(lookup(&[("STORYDECK_LOAD_TIMEOUT_MS", "soon")]));
        assert_eq!(config.initial_content_load_timeout, INITIAL_CONTENT_LOAD_TIMEOUT);
    }

    #[test]
    fn bots_always_get_vertical_ui() {
        let config = StoryConfig::default()
            .with_ui(UiType::DesktopPanels)
            .with_platform(Platform {
                bot: true,
                ..Platform::default()
            });
        assert_eq!(config.effective_ui(), UiType::Vertical);
    }
}
