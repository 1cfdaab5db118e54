use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::store::Note;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw listing query parameters, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Comma-separated; matches any-of.
    pub tags: Option<String>,
    pub archived: Option<bool>,
}

/// An owner-scoped note query. Built from `ListParams` plus the
/// authenticated identity; never constructed without an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteQuery {
    pub owner_id: Uuid,
    pub archived: Option<bool>,
    /// Empty means no tag filter at all.
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl NoteQuery {
    /// Turn optional filter/pagination parameters into a scoped query.
    /// Out-of-range page/limit values are clamped rather than rejected.
    pub fn build(owner_id: Uuid, params: &ListParams) -> Self {
        let page = params.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        // A tags parameter that cleans down to nothing is the same as no
        // tags parameter, not a match-nothing filter.
        let tags = params
            .tags
            .as_deref()
            .map(|raw| clean_tags(raw.split(',').map(String::from)))
            .unwrap_or_default();

        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Self {
            owner_id,
            archived: params.archived,
            tags,
            search,
            page,
            limit,
        }
    }

    pub fn skip(&self) -> i64 {
        // page is unbounded above; saturate instead of overflowing
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Predicate semantics in one place; the in-memory store evaluates it
    /// directly and the Postgres store translates it to SQL.
    pub fn matches(&self, note: &Note) -> bool {
        if note.owner_id != self.owner_id {
            return false;
        }

        if let Some(archived) = self.archived {
            if note.is_archived != archived {
                return false;
            }
        }

        if !self.tags.is_empty() && !note.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !note.title.to_lowercase().contains(&needle)
                && !note.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        true
    }
}

/// Trim tags and drop the ones that clean down to nothing, preserving order.
pub fn clean_tags<I: IntoIterator<Item = String>>(tags: I) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Pagination metadata returned alongside every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_notes: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn compute(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };

        Self {
            current_page: page,
            total_pages,
            total_notes: total,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}
