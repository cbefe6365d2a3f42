#![forbid(unsafe_code)]

//! Per-page transition tracing on stderr.
//!
//! `STORYDECK_DEBUG_TRACE` selects which switches are traced:
//!
//! | Value | Traced |
//! |-------|--------|
//! | unset, empty, `0`, `false` | nothing |
//! | `1`, `true`, `all` | every switch |
//! | `cover,p3` | only switches whose target is `cover` or `p3` |
//!
//! ```ignore
//! use storydeck_runtime::debug_trace;
//! debug_trace!("p3", "phase {} start", phase);
//! // [STORYDECK       12ms p3] phase secondary_ui start
//! ```

use std::fmt;
use std::sync::LazyLock;
use std::time::Instant;

/// Which switch targets produce trace lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFilter {
    Off,
    All,
    Pages(Vec<String>),
}

impl TraceFilter {
    /// Parse the env var value.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return Self::Off;
        };
        match value.to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "off" => Self::Off,
            "1" | "true" | "all" => Self::All,
            _ => Self::Pages(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn matches(&self, page_id: &str) -> bool {
        match self {
            Self::Off => false,
            Self::All => true,
            Self::Pages(ids) => ids.iter().any(|id| id == page_id),
        }
    }
}

static FILTER: LazyLock<TraceFilter> = LazyLock::new(|| {
    TraceFilter::parse(std::env::var("STORYDECK_DEBUG_TRACE").ok().as_deref())
});

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Whether switches to `page_id` are traced in this process.
#[inline]
pub fn is_enabled_for(page_id: &str) -> bool {
    FILTER.matches(page_id)
}

/// Milliseconds since the first trace call.
#[inline]
pub fn elapsed_ms() -> u64 {
    u64::try_from(START_TIME.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// One trace line, without the trailing newline.
#[must_use]
pub fn format_line(elapsed_ms: u64, page_id: &str, message: fmt::Arguments<'_>) -> String {
    format!("[STORYDECK {elapsed_ms:>8}ms {page_id}] {message}")
}

/// Print a trace line for a switch to `$page` when tracing selects it.
#[macro_export]
macro_rules! debug_trace {
    ($page:expr, $($arg:tt)*) => {{
        let page: &str = $page;
        if $crate::debug_trace::is_enabled_for(page) {
            eprintln!(
                "{}",
                $crate::debug_trace::format_line(
                    $crate::debug_trace::elapsed_ms(),
                    page,
                    format_args!($($arg)*),
                )
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_values() {
        assert_eq!(TraceFilter::parse(None), TraceFilter::Off);
        assert_eq!(TraceFilter::parse(Some(" ")), TraceFilter::Off);
        assert_eq!(TraceFilter::parse(Some("FALSE")), TraceFilter::Off);
        assert_eq!(TraceFilter::parse(Some("1")), TraceFilter::All);
        assert_eq!(TraceFilter::parse(Some("All")), TraceFilter::All);
        assert_eq!(
            TraceFilter::parse(Some("cover, p3,,")),
            TraceFilter::Pages(vec!["cover".into(), "p3".into()])
        );
    }

    #[test]
    fn page_filter_only_matches_listed_ids() {
        let filter = TraceFilter::parse(Some("cover,p3"));
        assert!(filter.matches("p3"));
        assert!(!filter.matches("p30"));
        assert!(TraceFilter::All.matches("anything"));
        assert!(!TraceFilter::Off.matches("p3"));
    }

    #[test]
    fn line_carries_time_and_page() {
        let line = format_line(12, "p3", format_args!("phase {} start", "secondary_ui"));
        assert_eq!(line, "[STORYDECK       12ms p3] phase secondary_ui start");
    }

    #[test]
    fn macro_expands() {
        debug_trace!("p1", "frame {} for {}", 3, "p1");
        let _ = elapsed_ms();
    }
}
