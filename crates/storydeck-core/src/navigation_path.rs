#![forbid(unsafe_code)]

//! Ordered history of visited page ids.

use serde::{Deserialize, Serialize};

/// Direction of a page switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationDirection {
    Next,
    Previous,
}

/// Visited page ids, oldest first.
///
/// Grows by [`push`](Self::push) on forward navigation and shrinks only by
/// [`pop`](Self::pop) on backward navigation. Pushing the current top is a
/// no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationPath {
    entries: Vec<String>,
}

impl NavigationPath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `page_id` unless it is already on top. Returns whether it grew.
    pub fn push(&mut self, page_id: &str) -> bool {
        if self.top() == Some(page_id) {
            return false;
        }
        self.entries.push(page_id.to_string());
        true
    }

    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop()
    }

    #[must_use]
    pub fn top(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Apply the bookkeeping for a switch to `target` in `direction`.
    ///
    /// Backward pops the top first; then the target is pushed unless it is
    /// already on top. Returns `true` if the path changed.
    pub fn apply(&mut self, target: &str, direction: NavigationDirection) -> bool {
        let popped = match direction {
            NavigationDirection::Previous => self.pop().is_some(),
            NavigationDirection::Next => false,
        };
        let pushed = self.push(target);
        popped || pushed
    }

    /// Entry recorded right before the first visit of `page_id`.
    #[must_use]
    pub fn predecessor_of(&self, page_id: &str) -> Option<&str> {
        let index = self.entries.iter().position(|e| e == page_id)?;
        index
            .checked_sub(1)
            .map(|i| self.entries[i].as_str())
    }

    /// Entry recorded right before the most recent visit of `page_id`.
    #[must_use]
    pub fn last_predecessor_of(&self, page_id: &str) -> Option<&str> {
        let index = self.entries.iter().rposition(|e| e == page_id)?;
        index
            .checked_sub(1)
            .map(|i| self.entries[i].as_str())
    }

    #[must_use]
    pub fn contains(&self, page_id: &str) -> bool {
        self.entries.iter().any(|e| e == page_id)
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}

impl From<Vec<String>> for NavigationPath {
    fn from(entries: Vec<String>) -> Self {
        Self { entries }
    }
}

impl From<&[String]> for NavigationPath {
    fn from(entries: &[String]) -> Self {
        Self {
            entries: entries.to_vec(),
        }
    }
}
