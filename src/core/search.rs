//! Search index - substring search and pagination over the entity cache
//!
//! The index is derived on demand: every search is an O(n) pass over the
//! current cache. Result pages resolve ids against the cache at render time
//! and skip entities that disappeared since the search ran.

use std::ops::Range;

use super::types::{CachedEntity, EntityCache};

/// Outcome of a search. An empty query is not "no results": it matches
/// everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results(SearchResults),
    NoResults { query: String },
}

/// Search `cache` for `query` (case-insensitive substring of the search key).
///
/// Matches are ordered by ascending search key; ties keep cache order.
pub fn search(cache: &EntityCache, query: &str, page_size: usize) -> SearchOutcome {
    let query = query.to_lowercase();

    let mut matches: Vec<&CachedEntity> = cache
        .iter()
        .filter(|e| query.is_empty() || e.search_key.contains(&query))
        .collect();

    if matches.is_empty() {
        return SearchOutcome::NoResults { query };
    }

    matches.sort_by(|a, b| a.search_key.cmp(&b.search_key));

    SearchOutcome::Results(SearchResults {
        query,
        ids: matches.into_iter().map(|e| e.id.clone()).collect(),
        page: 0,
        page_size: page_size.max(1),
    })
}

/// Slice out page `page_index` of `results`.
///
/// A page index past the last page is clamped to the last page.
pub fn page<T>(results: &[T], page_index: usize, page_size: usize) -> &[T] {
    let range = page_range(results.len(), page_index, page_size);
    &results[range]
}

fn page_range(total: usize, page_index: usize, page_size: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let last_page = total.saturating_sub(1) / page_size;
    let start = page_index.min(last_page) * page_size;
    start.min(total)..(start + page_size).min(total)
}

// =============================================================================
// SEARCH RESULTS
// =============================================================================

/// Ordered matches plus the currently displayed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    query: String,
    ids: Vec<String>,
    page: usize,
    page_size: usize,
}

impl SearchResults {
    /// Lower-cased query these results were computed for
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn total(&self) -> usize {
        self.ids.len()
    }

    pub fn page_index(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.ids.len().div_ceil(self.page_size)
    }

    /// Absolute index range of the current page
    pub fn page_range(&self) -> Range<usize> {
        page_range(self.ids.len(), self.page, self.page_size)
    }

    /// Ids on the current page
    pub fn current_page(&self) -> &[String] {
        page(&self.ids, self.page, self.page_size)
    }

    /// Number of results up to and including the current page ("X" of "X of Y")
    pub fn shown(&self) -> usize {
        self.page_range().end
    }

    /// Advance one page. No-op returning false when no results remain.
    pub fn next_page(&mut self) -> bool {
        let next_start = (self.page + 1) * self.page_size;
        if next_start >= self.ids.len() {
            return false;
        }
        self.page += 1;
        true
    }

    /// Go back one page. No-op returning false on the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Id at an absolute result index
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Current page resolved against the cache, skipping vanished entities.
    /// Each entry carries its absolute result index.
    pub fn page_entries<'a>(&self, cache: &'a EntityCache) -> Vec<(usize, &'a CachedEntity)> {
        self.page_range()
            .filter_map(|i| cache.get(&self.ids[i]).map(|e| (i, e)))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
