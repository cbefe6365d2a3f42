#![forbid(unsafe_code)]

//! Frame-synchronized phase runner for page transitions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐  frame  ┌─────────────────┐  frame  ┌──────────┐
//! │ ImmediateVisibility │ ──────▶ │   SecondaryUi   │ ──────▶ │ Deferred │
//! └─────────────────────┘         └─────────────────┘         └──────────┘
//! ```
//!
//! Each phase is a synchronous closure. The runner awaits one
//! [`FrameScheduler::next_frame`] between consecutive phases, never before
//! the first or after the last. Dropping the future cancels every phase that
//! has not started. A pipeline labelled with [`for_page`](TransitionPipeline::for_page)
//! tags its spans and trace lines with the target page.

use std::fmt;

use crate::debug_trace;
use crate::frame::FrameScheduler;

/// Steps of a page switch, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionPhase {
    /// Swap page visibility and start playback.
    ImmediateVisibility,
    /// Update secondary UI and commit the active page to the store.
    SecondaryUi,
    /// Preloading, triggers, and log context.
    Deferred,
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ImmediateVisibility => "immediate_visibility",
            Self::SecondaryUi => "secondary_ui",
            Self::Deferred => "deferred",
        })
    }
}

type PhaseFn<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Ordered list of phases awaiting one frame between each.
#[must_use = "a pipeline does nothing until run"]
pub struct TransitionPipeline<'a> {
    page_id: &'a str,
    phases: Vec<(TransitionPhase, PhaseFn<'a>)>,
}

impl Default for TransitionPipeline<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransitionPipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionPipeline")
            .field("page_id", &self.page_id)
            .field(
                "phases",
                &self.phases.iter().map(|(phase, _)| *phase).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<'a> TransitionPipeline<'a> {
    pub fn new() -> Self {
        Self {
            page_id: "",
            phases: Vec::new(),
        }
    }

    /// Label spans and trace lines with the page being switched to.
    pub fn for_page(mut self, page_id: &'a str) -> Self {
        self.page_id = page_id;
        self
    }

    /// Append a phase.
    pub fn phase<F>(mut self, phase: TransitionPhase, run: F) -> Self
    where
        F: FnOnce() + Send + 'a,
    {
        self.phases.push((phase, Box::new(run)));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Run every phase, awaiting a frame between consecutive phases.
    pub async fn run(self, frames: &dyn FrameScheduler) {
        let page_id = self.page_id;
        let mut phases = self.phases.into_iter().peekable();
        while let Some((phase, run)) = phases.next() {
            debug_trace!(page_id, "phase {phase} start");
            let span = tracing::debug_span!("transition_phase", %phase, page_id);
            span.in_scope(run);
            if phases.peek().is_some() {
                frames.next_frame().await;
                debug_trace!(page_id, "frame boundary after {phase}");
            }
        }
    }
}
