//! Generic filter-then-slice used by every list endpoint.
//!
//! Keyword matching is case-sensitive substring containment over the
//! record's [`Listable::search_fields`]; the status filter is an exact
//! match on [`Listable::status_str`]. `total` counts matches before the
//! page slice is taken.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Records that can be listed through [`paginate`].
pub trait Listable {
    /// Text fields the keyword is matched against.
    fn search_fields(&self) -> Vec<&str>;

    /// Lowercase status used by the `status` filter, if the record has one.
    fn status_str(&self) -> Option<&str> {
        None
    }
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-indexed page number (default 1).
    pub page: Option<i64>,
    /// Page size (default 20).
    pub page_size: Option<i64>,
    /// Case-sensitive substring filter.
    pub keyword: Option<String>,
    /// Exact status filter.
    pub status: Option<String>,
}

impl PageQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Resolve defaults and reject out-of-range values.
    fn bounds(&self) -> CoreResult<(usize, usize)> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(CoreError::Validation(format!(
                "page must be at least 1 (got {page})"
            )));
        }
        if page_size < 1 {
            return Err(CoreError::Validation(format!(
                "pageSize must be at least 1 (got {page_size})"
            )));
        }
        Ok((page as usize, page_size as usize))
    }

    fn matches<T: Listable>(&self, item: &T) -> bool {
        let keyword_ok = match self.keyword.as_deref() {
            None | Some("") => true,
            Some(kw) => item.search_fields().iter().any(|f| f.contains(kw)),
        };
        let status_ok = match self.status.as_deref() {
            None | Some("") => true,
            Some(wanted) => item.status_str() == Some(wanted),
        };
        keyword_ok && status_ok
    }
}

/// One page of a filtered collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Filter `items` by `query`, then return the requested page as clones.
pub fn paginate<'a, T, I>(items: I, query: &PageQuery) -> CoreResult<Page<T>>
where
    T: Listable + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let (page, page_size) = query.bounds()?;
    let matched: Vec<&T> = items.into_iter().filter(|item| query.matches(*item)).collect();
    let total = matched.len();
    let start = (page - 1).saturating_mul(page_size);
    let items = matched
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();
    Ok(Page {
        items,
        total,
        page,
        page_size,
    })
}
