//! Offset/limit pagination over filtered collection reads.
//!
//! # Invariants
//! - `page < 1` is read as page 1; `limit < 1` as the listing's default.
//! - `limit` above the configured ceiling is rejected, never truncated.
//! - Fetch and count are two independent reads; `total` may reflect writes
//!   the page does not (and vice versa).
//! - Items keep storage order; no sort is imposed here.

use crate::error::{CoreError, CoreResult};
use crate::model::document::Document;
use crate::repo::document_store::{Collection, DocumentStore, FindQuery};
use crate::repo::filter::Filter;
use serde::Serialize;

/// Caller-supplied page coordinates, unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }
}

impl Default for PageRequest {
    /// First page at the listing's default size.
    fn default() -> Self {
        Self { page: 1, limit: 0 }
    }
}

/// Per-listing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    pub default_limit: u32,
    pub max_limit: u32,
}

/// One page of results plus the size of the whole matching set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    /// Converts every item, keeping page metadata.
    pub fn try_map<U, E>(self, convert: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(convert).collect::<Result<_, _>>()?,
            total: self.total,
            page: self.page,
            limit: self.limit,
        })
    }
}

/// Clamped `(page, limit)` for a request under `policy`.
pub fn resolve_page(request: PageRequest, policy: PagePolicy) -> CoreResult<(u64, u64)> {
    let page = u64::try_from(request.page.max(1)).unwrap_or(1);
    let limit = if request.limit < 1 {
        u64::from(policy.default_limit)
    } else {
        u64::try_from(request.limit).unwrap_or(u64::MAX)
    };
    if limit > u64::from(policy.max_limit) {
        return Err(CoreError::InvalidArgument(format!(
            "limit {limit} exceeds maximum page size {}",
            policy.max_limit
        )));
    }
    Ok((page, limit))
}

/// Fetches one page of `collection` documents matching `filter`.
pub fn paginate<S: DocumentStore>(
    store: &S,
    collection: Collection,
    filter: &Filter,
    request: PageRequest,
    policy: PagePolicy,
) -> CoreResult<Page<Document>> {
    let (page, limit) = resolve_page(request, policy)?;
    let skip = (page - 1).saturating_mul(limit);

    let items = store.find(
        collection,
        &FindQuery::new(filter.clone()).skip(skip).limit(limit),
    )?;
    let total = store.count(collection, filter)?;

    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::{resolve_page, PagePolicy, PageRequest};
    use crate::error::CoreError;

    const POLICY: PagePolicy = PagePolicy {
        default_limit: 5,
        max_limit: 100,
    };

    #[test]
    fn clamps_page_and_limit() {
        assert_eq!(resolve_page(PageRequest::new(0, 0), POLICY).unwrap(), (1, 5));
        assert_eq!(resolve_page(PageRequest::new(-3, -1), POLICY).unwrap(), (1, 5));
        assert_eq!(resolve_page(PageRequest::new(4, 20), POLICY).unwrap(), (4, 20));
        assert_eq!(resolve_page(PageRequest::default(), POLICY).unwrap(), (1, 5));
    }

    #[test]
    fn rejects_limit_above_ceiling() {
        let err = resolve_page(PageRequest::new(1, 101), POLICY).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(resolve_page(PageRequest::new(1, 100), POLICY).is_ok());
    }
}
