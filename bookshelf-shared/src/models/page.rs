/// Pagination primitives shared by every listing endpoint
///
/// Query strings arrive untyped (`?page=2&limit=abc`), so `PageRequest`
/// resolves them leniently: absent, unparsable or non-positive values fall
/// back to the defaults instead of failing the request.
///
/// # Example
///
/// ```
/// use bookshelf_shared::models::page::PageRequest;
///
/// let page = PageRequest::from_query(Some("3"), Some("5"), 10);
/// assert_eq!(page.offset(), 10);
///
/// let fallback = PageRequest::from_query(Some("zero"), None, 10);
/// assert_eq!((fallback.page(), fallback.limit()), (1, 10));
/// ```

use serde::Serialize;

/// Upper bound on `limit` to keep a single page bounded
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A resolved page request (1-based page number)
///
/// Only constructible through [`PageRequest::new`] or
/// [`PageRequest::from_query`], so `limit` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    /// Creates a page request, clamping both values into their valid ranges
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Resolves raw query-string values
    ///
    /// `default_limit` applies when `limit` is missing or invalid.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = parse_positive(limit).unwrap_or(default_limit);
        Self::new(page, limit)
    }

    /// Page number, starting at 1
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Maximum number of items on the page
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Number of items to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page (at most `request.limit()`)
    pub items: Vec<T>,

    /// Total number of matching items across all pages
    pub total: i64,

    /// The request that produced this page
    #[serde(skip)]
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Creates a page
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    /// `ceil(total / limit)`
    pub fn total_pages(&self) -> i64 {
        let limit = self.request.limit();
        (self.total + limit - 1) / limit
    }

    /// Maps the items while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

/// Slices an already filtered and sorted collection into a page
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    let items = items.into_iter().skip(offset).take(limit).collect();

    Page::new(items, total, request)
}
