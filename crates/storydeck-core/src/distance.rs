#![forbid(unsafe_code)]

//! Hop distances from the active page, used to prioritize preloading.
//!
//! # Algorithm
//!
//! Iterative breadth-first search over [`PageGraph::adjacent_ids`] with an
//! explicit queue and a visited-distance map. The result is immutable.
//!
//! Adjustments applied on top of plain BFS:
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | Degraded rendering | Every page at distance 0 |
//! | Branching | Path predecessor of the active page at distance 1 |
//! | Last page, not branching, no swipe, more than one page | First page at distance 1 |
//!
//! The last two never combine: the wrap only applies to linear stories.

use std::collections::{HashMap, VecDeque};

use crate::error::StoreError;
use crate::navigation_path::NavigationPath;
use crate::page::PageGraph;

/// Switches that change how distances are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceOptions {
    pub branching: bool,
    /// Host can swipe to another document at the story's ends.
    pub swipe_capable: bool,
    /// Vertical or crawler rendering: everything loads at once.
    pub degraded: bool,
}

/// Distance of every reachable page from the active page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDistances {
    distances: HashMap<String, u32>,
    buckets: Vec<Vec<String>>,
}

impl PageDistances {
    #[must_use]
    pub fn get(&self, page_id: &str) -> Option<u32> {
        self.distances.get(page_id).copied()
    }

    /// Pages grouped by distance; each bucket is in graph order.
    #[must_use]
    pub fn buckets(&self) -> &[Vec<String>] {
        &self.buckets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// `(page_id, distance)` pairs, nearest first, graph order within a distance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.buckets.iter().enumerate().flat_map(|(d, bucket)| {
            let d = u32::try_from(d).unwrap_or(u32::MAX);
            bucket.iter().map(move |id| (id.as_str(), d))
        })
    }

    #[must_use]
    pub fn as_map(&self) -> &HashMap<String, u32> {
        &self.distances
    }
}

/// Compute distances from `active` across `graph`.
///
/// # Errors
///
/// [`StoreError::UnknownPage`] when `active` is not in the graph.
pub fn page_distances(
    graph: &PageGraph,
    active: &str,
    path: &NavigationPath,
    options: DistanceOptions,
) -> Result<PageDistances, StoreError> {
    if !graph.contains(active) {
        return Err(StoreError::UnknownPage(active.to_string()));
    }

    let mut distances: HashMap<String, u32> = HashMap::with_capacity(graph.len());
    if options.degraded {
        distances.extend(graph.pages().iter().map(|p| (p.id.clone(), 0)));
        return Ok(bucketize(graph, distances));
    }

    distances.insert(active.to_string(), 0);
    let mut queue = VecDeque::from([active.to_string()]);
    while let Some(id) = queue.pop_front() {
        let next_distance = distances.get(&id).copied().unwrap_or(0) + 1;
        let mut neighbours = graph.adjacent_ids(&id, path, options.branching);
        if options.branching && id == active {
            if let Some(predecessor) = path.predecessor_of(active) {
                neighbours.insert(0, predecessor.to_string());
            }
        }
        for neighbour in neighbours {
            if !graph.contains(&neighbour) {
                tracing::warn!(page_id = %id, target = %neighbour, "link to unknown page");
                continue;
            }
            if distances.contains_key(&neighbour) {
                continue;
            }
            distances.insert(neighbour.clone(), next_distance);
            queue.push_back(neighbour);
        }
    }

    let is_last = graph.last().is_some_and(|p| p.id == active);
    if !options.branching && !options.swipe_capable && is_last && graph.len() > 1 {
        if let Some(first) = graph.first() {
            if let Some(d) = distances.get_mut(&first.id) {
                *d = 1;
            }
        }
    }

    Ok(bucketize(graph, distances))
}

fn bucketize(graph: &PageGraph, distances: HashMap<String, u32>) -> PageDistances {
    let depth = distances.values().copied().max().map_or(0, |d| d as usize + 1);
    let mut buckets = vec![Vec::new(); depth];
    for page in graph.pages() {
        if let Some(&d) = distances.get(&page.id) {
            buckets[d as usize].push(page.id.clone());
        }
    }
    PageDistances { distances, buckets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    fn linear(ids: &[&str]) -> PageGraph {
        PageGraph::new(ids.iter().map(|id| Page::new(*id)).collect())
    }

    fn swipe() -> DistanceOptions {
        DistanceOptions {
            swipe_capable: true,
            ..DistanceOptions::default()
        }
    }

    #[test]
    fn linear_bfs_from_second_page() {
        let graph = linear(&["p0", "p1", "p2", "p3"]);
        let d = page_distances(&graph, "p1", &NavigationPath::new(), swipe()).unwrap();
        assert_eq!(d.get("p1"), Some(0));
        assert_eq!(d.get("p0"), Some(1));
        assert_eq!(d.get("p2"), Some(1));
        assert_eq!(d.get("p3"), Some(2));
        assert_eq!(
            d.buckets(),
            [vec!["p1".to_string()], vec!["p0".into(), "p2".into()], vec!["p3".into()]]
        );
    }

    #[test]
    fn last_page_wraps_to_first_without_swipe() {
        let graph = linear(&["p0", "p1", "p2"]);
        let path = NavigationPath::from(vec!["p1".to_string(), "p2".into()]);
        let d = page_distances(&graph, "p2", &path, DistanceOptions::default()).unwrap();
        assert_eq!(d.get("p0"), Some(1));
        let d = page_distances(&graph, "p2", &path, swipe()).unwrap();
        assert_eq!(d.get("p0"), Some(2));
    }

    #[test]
    fn single_page_story_does_not_wrap() {
        let graph = linear(&["only"]);
        let d = page_distances(&graph, "only", &NavigationPath::new(), DistanceOptions::default())
            .unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.get("only"), Some(0));
    }

    #[test]
    fn degraded_mode_puts_everything_at_zero() {
        let graph = linear(&["p0", "p1", "p2"]);
        let options = DistanceOptions {
            degraded: true,
            ..DistanceOptions::default()
        };
        let d = page_distances(&graph, "p0", &NavigationPath::new(), options).unwrap();
        assert_eq!(d.buckets().len(), 1);
        assert_eq!(d.buckets()[0], vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn branch_targets_are_adjacent_when_branching() {
        let graph = PageGraph::new(vec![
            Page::new("p0").with_branch_target("p3"),
            Page::new("p1"),
            Page::new("p2"),
            Page::new("p3"),
        ]);
        let options = DistanceOptions {
            branching: true,
            swipe_capable: true,
            ..DistanceOptions::default()
        };
        let d = page_distances(&graph, "p0", &NavigationPath::new(), options).unwrap();
        assert_eq!(d.get("p3"), Some(1));
        let d = page_distances(&graph, "p0", &NavigationPath::new(), swipe()).unwrap();
        assert_eq!(d.get("p3"), Some(3));
    }

    #[test]
    fn branching_predecessor_is_at_distance_one() {
        let mut pages: Vec<Page> = (0..8).map(|i| Page::new(format!("p{i}"))).collect();
        pages[5].branch_targets.push("p2".into());
        let graph = PageGraph::new(pages);
        // Visited p2 from p5, then came back to p2 after a detour to p3.
        let path = NavigationPath::from(vec![
            "p0".to_string(),
            "p5".into(),
            "p2".into(),
            "p3".into(),
            "p2".into(),
        ]);
        let options = DistanceOptions {
            branching: true,
            ..DistanceOptions::default()
        };
        let d = page_distances(&graph, "p2", &path, options).unwrap();
        assert_eq!(d.get("p2"), Some(0));
        assert_eq!(d.get("p5"), Some(1));
        assert_eq!(d.get("p3"), Some(1));
    }

    #[test]
    fn last_page_wrap_is_skipped_when_branching() {
        let graph = linear(&["p0", "p1", "p2"]);
        let options = DistanceOptions {
            branching: true,
            ..DistanceOptions::default()
        };
        let d = page_distances(&graph, "p2", &NavigationPath::new(), options).unwrap();
        assert_eq!(d.get("p0"), Some(2));
    }

    #[test]
    fn unknown_active_page_is_an_error() {
        let graph = linear(&["p0"]);
        let err = page_distances(&graph, "nope", &NavigationPath::new(), swipe()).unwrap_err();
        assert_eq!(err, StoreError::UnknownPage("nope".into()));
    }
}
