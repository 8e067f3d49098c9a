//! Search, sort and pagination over the reference cache
//!
//! The list view is a pure derivation of `(cache, state)`: filter by search
//! term, stable-sort by key and order, clamp the page, slice it out.

use crate::catalogue::CreatureSummary;
use crate::pagination::{calculate_pagination, clamp_page, page_info, PageInfo};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    #[default]
    Id,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortOrder::Asc => "▲",
            SortOrder::Desc => "▼",
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "id" => Ok(SortKey::Id),
            other => Err(format!("Invalid sort key: {other}. Valid keys: name, id")),
        }
    }
}

/// User-controlled inputs of the list view
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ListState {
    pub search_term: String,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: usize,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
            page: 1,
        }
    }
}

impl ListState {
    /// Change the search term; always returns to the first page
    pub fn set_search_term(&mut self, text: impl Into<String>) {
        self.search_term = text.into();
        self.page = 1;
    }

    /// Selecting the active key flips the order, a new key starts ascending
    pub fn set_sort(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.sort_order = self.sort_order.flipped();
        } else {
            self.sort_key = key;
            self.sort_order = SortOrder::Asc;
        }
    }

    pub fn go_to_page(&mut self, page: usize, filtered_count: usize, page_size: usize) {
        self.page = clamp_page(page, filtered_count, page_size);
    }

    pub fn next_page(&mut self, filtered_count: usize, page_size: usize) {
        self.go_to_page(self.page.saturating_add(1), filtered_count, page_size);
    }

    pub fn previous_page(&mut self, filtered_count: usize, page_size: usize) {
        self.go_to_page(self.page.saturating_sub(1), filtered_count, page_size);
    }
}

/// Derived list view: the references on the current page plus page metadata
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ListView {
    pub search_term: String,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub filtered_count: usize,
    pub refs: Vec<CreatureSummary>,
    pub pagination: PageInfo,
}

/// Case-insensitive substring match on name; an empty term keeps everything
pub fn filter_by_name<'a>(
    cache: &'a [CreatureSummary],
    search_term: &str,
) -> Vec<&'a CreatureSummary> {
    let needle = search_term.to_lowercase();
    cache
        .iter()
        .filter(|summary| summary.name.to_lowercase().contains(&needle))
        .collect()
}

fn compare(a: &CreatureSummary, b: &CreatureSummary, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Id => a.id.cmp(&b.id),
    }
}

/// Stable sort; ties keep their original relative order in both directions
pub fn sort_summaries(summaries: &mut [&CreatureSummary], key: SortKey, order: SortOrder) {
    summaries.sort_by(|a, b| match order {
        SortOrder::Asc => compare(a, b, key),
        SortOrder::Desc => compare(b, a, key),
    });
}

/// Filtered and sorted sequence, before pagination
pub fn filter_and_sort<'a>(
    cache: &'a [CreatureSummary],
    state: &ListState,
) -> Vec<&'a CreatureSummary> {
    let mut filtered = filter_by_name(cache, &state.search_term);
    sort_summaries(&mut filtered, state.sort_key, state.sort_order);
    filtered
}

/// Derive the list view for the given inputs
pub fn recompute(cache: &[CreatureSummary], state: &ListState, page_size: usize) -> ListView {
    let filtered = filter_and_sort(cache, state);
    let filtered_count = filtered.len();
    let (start, end) = calculate_pagination(filtered_count, state.page, page_size);

    ListView {
        search_term: state.search_term.clone(),
        sort_key: state.sort_key,
        sort_order: state.sort_order,
        filtered_count,
        refs: filtered[start..end].iter().map(|s| (*s).clone()).collect(),
        pagination: page_info(state.page, filtered_count, page_size),
    }
}
