#![forbid(unsafe_code)]

//! Pages and the ordered page graph.
//!
//! The graph owns the canonical page list. Order is document order; links
//! between pages come from three places:
//!
//! - authored overrides (`advance_to` when branching, `auto_advance_to`,
//!   `branch_targets`),
//! - links written by [`PageGraph::insert_page`] (`spliced_next`,
//!   `return_to`),
//! - document order, skipping ads.
//!
//! # Design Invariants
//!
//! 1. **Unique ids**: duplicates are renamed at construction (`-2`, `-3`, ...).
//! 2. **Ungated first page**: access attributes on the first page are stripped.
//! 3. **Append-only**: pages are inserted or moved, never removed.

use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::navigation_path::NavigationPath;

/// One page of a story.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub id: String,
    /// Manual next override; honored only when branching is enabled.
    pub advance_to: Option<String>,
    /// Next page on automatic advancement.
    pub auto_advance_to: Option<String>,
    /// Previous override written by page insertion.
    pub return_to: Option<String>,
    /// Manual next link written by page insertion when branching is off.
    pub spliced_next: Option<String>,
    /// Go-to-page action targets.
    pub branch_targets: Vec<String>,
    pub is_ad: bool,
    /// Page advances on a timer or on media end.
    pub is_auto_advance: bool,
    /// Navigation waits for the first authorization check.
    pub requires_access: bool,
    /// Page stays hidden until authorization grants access.
    pub hidden_until_authorized: bool,
    /// Last distance applied by the controller.
    pub distance: Option<u32>,
}

impl Page {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ad(id: impl Into<String>) -> Self {
        Self {
            is_ad: true,
            ..Self::new(id)
        }
    }

    #[must_use]
    pub fn with_advance_to(mut self, target: impl Into<String>) -> Self {
        self.advance_to = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_auto_advance_to(mut self, target: impl Into<String>) -> Self {
        self.auto_advance_to = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_branch_target(mut self, target: impl Into<String>) -> Self {
        self.branch_targets.push(target.into());
        self
    }

    #[must_use]
    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.is_auto_advance = auto_advance;
        self
    }

    #[must_use]
    pub fn with_requires_access(mut self, required: bool) -> Self {
        self.requires_access = required;
        self
    }

    #[must_use]
    pub fn with_hidden_until_authorized(mut self, hidden: bool) -> Self {
        self.hidden_until_authorized = hidden;
        self
    }
}

/// Ordered, append-only page collection with adjacency queries.
#[derive(Debug, Clone, Default)]
pub struct PageGraph {
    pages: Vec<Page>,
    index: HashMap<String, usize>,
}

impl PageGraph {
    /// Build the graph, renaming duplicate ids and ungating the first page.
    #[must_use]
    pub fn new(mut pages: Vec<Page>) -> Self {
        let mut in_use: HashSet<String> = pages.iter().map(|p| p.id.clone()).collect();
        let mut seen = HashSet::new();
        for page in &mut pages {
            if seen.insert(page.id.clone()) {
                continue;
            }
            let renamed = (2..)
                .map(|n| format!("{}-{n}", page.id))
                .find(|candidate| !in_use.contains(candidate))
                .unwrap_or_default();
            tracing::warn!(page_id = %page.id, renamed = %renamed, "duplicate page id");
            in_use.insert(renamed.clone());
            seen.insert(renamed.clone());
            page.id = renamed;
        }

        if let Some(first) = pages.first_mut() {
            if first.requires_access || first.hidden_until_authorized {
                tracing::warn!(
                    page_id = %first.id,
                    "first page cannot be access gated; ignoring access attributes"
                );
                first.requires_access = false;
                first.hidden_until_authorized = false;
            }
        }

        let mut graph = Self {
            pages,
            index: HashMap::new(),
        };
        graph.reindex();
        graph
    }

    fn reindex(&mut self) {
        self.index = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// User-facing page count; ads excluded.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_ad).count()
    }

    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.id.clone()).collect()
    }

    #[must_use]
    pub fn page(&self, id: &str) -> Option<&Page> {
        self.index.get(id).map(|&i| &self.pages[i])
    }

    pub fn page_mut(&mut self, id: &str) -> Option<&mut Page> {
        let i = *self.index.get(id)?;
        self.pages.get_mut(i)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn page_at(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Page> {
        self.pages.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Page> {
        self.pages.last()
    }

    /// Next page from `id`.
    ///
    /// Automatic advancement honors `auto_advance_to` first. Manual links
    /// come from `advance_to` when branching, `spliced_next` otherwise.
    /// Falls back to the next non-ad page in document order.
    #[must_use]
    pub fn next_page_id(&self, id: &str, automatic: bool, branching: bool) -> Option<&str> {
        let i = self.index_of(id)?;
        let page = &self.pages[i];
        if automatic {
            if let Some(target) = &page.auto_advance_to {
                return Some(target.as_str());
            }
        }
        let manual = if branching {
            &page.advance_to
        } else {
            &page.spliced_next
        };
        if let Some(target) = manual {
            return Some(target.as_str());
        }
        self.pages[i + 1..]
            .iter()
            .find(|p| !p.is_ad)
            .map(|p| p.id.as_str())
    }

    /// Previous page from `id`.
    ///
    /// `return_to` wins; then the page visited right before the latest visit
    /// of `id`; then the previous non-ad page in document order.
    #[must_use]
    pub fn previous_page_id<'a>(&'a self, id: &str, path: &'a NavigationPath) -> Option<&'a str> {
        let i = self.index_of(id)?;
        let page = &self.pages[i];
        if let Some(target) = &page.return_to {
            return Some(target.as_str());
        }
        if let Some(previous) = path.last_predecessor_of(id) {
            return Some(previous);
        }
        self.pages[..i]
            .iter()
            .rev()
            .find(|p| !p.is_ad)
            .map(|p| p.id.as_str())
    }

    /// Neighbours reachable in one hop, in traversal order.
    ///
    /// Branch targets (branching only), then automatic next, manual next if
    /// different, then previous.
    #[must_use]
    pub fn adjacent_ids(&self, id: &str, path: &NavigationPath, branching: bool) -> Vec<String> {
        let Some(page) = self.page(id) else {
            return Vec::new();
        };
        let mut adjacent: Vec<String> = if branching {
            page.branch_targets.clone()
        } else {
            Vec::new()
        };
        let auto_next = self.next_page_id(id, true, branching);
        let manual_next = self.next_page_id(id, false, branching);
        if let Some(next) = auto_next {
            adjacent.push(next.to_string());
        }
        if let Some(next) = manual_next {
            if Some(next) != auto_next {
                adjacent.push(next.to_string());
            }
        }
        if let Some(previous) = self.previous_page_id(id, path) {
            adjacent.push(previous.to_string());
        }
        adjacent
    }

    /// Desktop panel offsets around `target`: itself at 0, up to two pages
    /// back (-1, -2) and two pages forward (+1, +2).
    #[must_use]
    pub fn desktop_positions(
        &self,
        target: &str,
        path: &NavigationPath,
        branching: bool,
    ) -> Vec<(String, i8)> {
        if !self.contains(target) {
            return Vec::new();
        }
        let mut positions = vec![(target.to_string(), 0)];
        if let Some(minus_one) = self.previous_page_id(target, path) {
            positions.push((minus_one.to_string(), -1));
            if let Some(minus_two) = self.previous_page_id(minus_one, path) {
                positions.push((minus_two.to_string(), -2));
            }
        }
        if let Some(plus_one) = self.next_page_id(target, false, branching) {
            positions.push((plus_one.to_string(), 1));
            if let Some(plus_two) = self.next_page_id(plus_one, false, branching) {
                positions.push((plus_two.to_string(), 2));
            }
        }
        positions
    }

    /// Record `distance` on page `id`. Returns `false` for unknown ids.
    pub fn set_distance(&mut self, id: &str, distance: u32) -> bool {
        match self.page_mut(id) {
            Some(page) => {
                page.distance = Some(distance);
                true
            }
            None => false,
        }
    }

    /// Splice `page` into the graph right after `before_id`.
    ///
    /// A page id already in the graph is moved; a new one is appended first.
    /// `before_id` is relinked to the inserted page, and when the inserted
    /// page is not itself the next page, it is linked forward to the page
    /// that used to follow `before_id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownPage`] for an unknown `before_id`;
    /// [`StoreError::NoNextPage`] when nothing follows `before_id`.
    pub fn insert_page(
        &mut self,
        before_id: &str,
        page: Page,
        branching: bool,
    ) -> Result<(), StoreError> {
        if !self.contains(before_id) {
            return Err(StoreError::UnknownPage(before_id.to_string()));
        }
        let inserted_id = page.id.clone();
        let replaced = match self.index_of(&inserted_id) {
            Some(i) => Some(std::mem::replace(&mut self.pages[i], page)),
            None => {
                self.pages.push(page);
                self.reindex();
                None
            }
        };

        let Some(next_id) = self
            .next_page_id(before_id, true, branching)
            .map(str::to_string)
        else {
            match replaced {
                Some(original) => {
                    if let Some(slot) = self.page_mut(&inserted_id) {
                        *slot = original;
                    }
                }
                None => {
                    self.pages.pop();
                    self.reindex();
                }
            }
            return Err(StoreError::NoNextPage(before_id.to_string()));
        };

        let link = |page: &mut Page, target: &str| {
            if branching {
                page.advance_to = Some(target.to_string());
            } else {
                page.spliced_next = Some(target.to_string());
            }
            page.auto_advance_to = Some(target.to_string());
        };

        if let Some(before) = self.page_mut(before_id) {
            link(before, &inserted_id);
        }
        if let Some(inserted) = self.page_mut(&inserted_id) {
            inserted.return_to = Some(before_id.to_string());
        }
        if next_id != inserted_id {
            if let Some(inserted) = self.page_mut(&inserted_id) {
                link(inserted, &next_id);
            }
            if let Some(next) = self.page_mut(&next_id) {
                next.return_to = Some(inserted_id.clone());
            }
        }

        if let Some(from) = self.index_of(&inserted_id) {
            let moved = self.pages.remove(from);
            self.reindex();
            let at = self.index_of(before_id).map_or(self.pages.len(), |i| i + 1);
            self.pages.insert(at, moved);
            self.reindex();
        }
        tracing::debug!(page_id = %inserted_id, before = %before_id, "page inserted");
        Ok(())
    }
}
