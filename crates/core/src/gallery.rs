//! Gallery state: infinite-scroll batches and the type intersection filter

use crate::catalogue::{CreatureDetail, CreatureSummary};
use serde::Serialize;
use std::collections::HashSet;

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 100.0;

/// Scroll position of the gallery viewport, in layout units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub viewport_height: f64,
    pub scroll_top: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    /// Metrics for a viewport resting at the very bottom of its content
    pub fn at_bottom(content_height: f64) -> Self {
        Self {
            viewport_height: content_height,
            scroll_top: 0.0,
            content_height,
        }
    }
}

/// Canonical form of a type name as the catalogue spells it
pub fn normalize_type_name(type_name: &str) -> String {
    type_name.trim().to_lowercase()
}

/// True once the viewport bottom is within `threshold` of the content end
pub fn is_near_bottom(metrics: ScrollMetrics, threshold: f64) -> bool {
    metrics.viewport_height + metrics.scroll_top >= metrics.content_height - threshold
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct GalleryState {
    /// Details loaded by infinite scroll, in load order
    pub loaded: Vec<CreatureDetail>,
    /// Index offset of the next batch
    pub offset: usize,
    pub loading: bool,
    /// An intersection filter is being computed
    pub filtering: bool,
    /// Set once a batch comes back empty
    pub exhausted: bool,
    /// Selected types in selection order
    pub selected_types: Vec<String>,
    /// Result of the last committed intersection filter
    pub filtered: Vec<CreatureDetail>,
}

impl GalleryState {
    pub fn is_filtered(&self) -> bool {
        !self.selected_types.is_empty()
    }

    /// Add the type if absent, remove it if present; returns whether it is now selected
    ///
    /// Blank names are ignored.
    pub fn toggle_type(&mut self, type_name: &str) -> bool {
        let type_name = normalize_type_name(type_name);
        if type_name.is_empty() {
            return false;
        }

        if let Some(pos) = self.selected_types.iter().position(|t| *t == type_name) {
            self.selected_types.remove(pos);
            false
        } else {
            self.selected_types.push(type_name);
            true
        }
    }

    /// Replace the whole selection, normalised and without duplicates
    pub fn select_types(&mut self, types: &[String]) {
        self.selected_types.clear();
        for type_name in types {
            let type_name = normalize_type_name(type_name);
            if !type_name.is_empty() && !self.selected_types.contains(&type_name) {
                self.selected_types.push(type_name);
            }
        }
    }

    /// Whether a scroll event at `metrics` should start the next batch
    pub fn should_load_batch(&self, metrics: ScrollMetrics, threshold: f64) -> bool {
        !self.loading && !self.is_filtered() && !self.exhausted && is_near_bottom(metrics, threshold)
    }

    /// Whether the gallery needs its first batch
    pub fn needs_initial_batch(&self) -> bool {
        self.loaded.is_empty() && !self.is_filtered() && !self.loading && !self.exhausted
    }

    /// Append a fetched batch, skipping ids already loaded, and advance the offset
    ///
    /// Returns the number of new entries.
    pub fn append_batch(&mut self, batch: Vec<CreatureDetail>, batch_size: usize) -> usize {
        let added = merge_unique(&mut self.loaded, batch);
        self.offset += batch_size;
        added
    }

    /// What the gallery shows: the filter result when any type is selected
    pub fn display(&self) -> &[CreatureDetail] {
        if self.is_filtered() {
            &self.filtered
        } else {
            &self.loaded
        }
    }
}

/// Append entries whose id is not yet present; returns how many were added
pub fn merge_unique(loaded: &mut Vec<CreatureDetail>, batch: Vec<CreatureDetail>) -> usize {
    let mut seen: HashSet<u32> = loaded.iter().map(|d| d.id).collect();
    let before = loaded.len();
    for detail in batch {
        if seen.insert(detail.id) {
            loaded.push(detail);
        }
    }
    loaded.len() - before
}

/// References for the batch starting at `offset`; empty past the end
pub fn batch_refs(cache: &[CreatureSummary], offset: usize, batch_size: usize) -> &[CreatureSummary] {
    let start = offset.min(cache.len());
    let end = (start + batch_size).min(cache.len());
    &cache[start..end]
}

/// Intersection of per-type member sets
///
/// `None` when no type is selected, meaning no filter applies.
pub fn intersect_members(sets: &[HashSet<String>]) -> Option<HashSet<String>> {
    let (first, rest) = sets.split_first()?;
    Some(
        first
            .iter()
            .filter(|name| rest.iter().all(|set| set.contains(*name)))
            .cloned()
            .collect(),
    )
}

/// Cache entries whose name survived the intersection, in cache order
pub fn select_from_cache(cache: &[CreatureSummary], names: &HashSet<String>) -> Vec<CreatureSummary> {
    cache
        .iter()
        .filter(|summary| names.contains(&summary.name))
        .cloned()
        .collect()
}
