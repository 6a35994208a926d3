//! Pagination utilities
//!
//! Out-of-range pages are not an error: a page below 1 is treated as the
//! first page, and a page past the end yields no items.

use serde::{Deserialize, Deserializer, Serialize};

/// Upper bound for client-supplied page sizes
pub const MAX_PER_PAGE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Items per page
    pub per_page: i64,
    /// Total number of matching rows
    pub total: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

impl Pagination {
    /// Calculate pagination metadata from total results and requested page
    ///
    /// # Examples
    /// ```
    /// use gg_common::pagination::Pagination;
    ///
    /// // 45 results at 20 per page = 3 pages (20 + 20 + 5)
    /// let p = Pagination::new(45, 2, 20);
    /// assert_eq!(p.offset, 20);
    /// assert!(p.has_prev());
    /// assert!(p.has_next());
    ///
    /// // Past the end: no next page, nothing to show
    /// let p = Pagination::new(45, 9, 20);
    /// assert!(!p.has_next());
    /// ```
    pub fn new(total: i64, requested_page: i64, per_page: i64) -> Self {
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let page = requested_page.max(1);
        Self {
            page,
            per_page,
            total,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }

    pub fn pages(&self) -> i64 {
        self.total / self.per_page + i64::from(self.total % self.per_page != 0)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }
}

/// One page of rows plus its metadata
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Query string for paginated endpoints
///
/// Values that are not integers fall back to their defaults.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page", deserialize_with = "page_number")]
    pub page: i64,
    #[serde(default, deserialize_with = "optional_number")]
    pub per_page: Option<i64>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: None,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn optional_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

fn page_number<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(optional_number(d)?.unwrap_or_else(default_page))
}

/// Serializable page links, e.g. `{"prev": null, "next": "...", "count": 3}`
#[derive(Debug, Clone, Serialize)]
pub struct PageLinks {
    pub prev: Option<String>,
    pub next: Option<String>,
    pub count: i64,
}

impl PageLinks {
    /// Build links by rendering `page_url(page)` for neighbouring pages
    pub fn build(p: &Pagination, page_url: impl Fn(i64) -> String) -> Self {
        Self {
            prev: p.has_prev().then(|| page_url(p.page - 1)),
            next: p.has_next().then(|| page_url(p.page + 1)),
            count: p.total,
        }
    }
}
