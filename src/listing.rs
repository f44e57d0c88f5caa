//! Search, single categorical filter and fixed-size pagination over lists.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::utils::json::{lookup_path, value_as_text};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub q: Option<String>,
    pub filter_by: Option<String>,
    pub filter_value: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug)]
pub struct RecordFilter<'a> {
    needle: Option<String>,
    search_fields: &'a [&'a str],
    category: Option<(String, String)>,
}

impl<'a> RecordFilter<'a> {
    pub fn new(search_fields: &'a [&'a str]) -> Self {
        Self {
            needle: None,
            search_fields,
            category: None,
        }
    }

    pub fn search(mut self, query: Option<&str>) -> Self {
        self.needle = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        self
    }

    /// Equality on one field. An empty value or `all` means no filter.
    pub fn category(mut self, field: &str, value: &str) -> Self {
        let value = value.trim();
        self.category = (!value.is_empty() && !value.eq_ignore_ascii_case("all"))
            .then(|| (field.to_string(), value.to_string()));
        self
    }

    /// Builds the filter from query parameters, checking `filterBy` against
    /// the fields the resource allows.
    pub fn from_query(
        query: &ListQuery,
        search_fields: &'a [&'a str],
        filter_fields: &[&str],
    ) -> AppResult<Self> {
        let mut filter = RecordFilter::new(search_fields).search(query.q.as_deref());
        if let Some(field) = query.filter_by.as_deref().filter(|f| !f.is_empty()) {
            if !filter_fields.contains(&field) {
                return Err(AppError::bad_request(format!(
                    "cannot filter by '{field}'; allowed: {}",
                    filter_fields.join(", ")
                )));
            }
            filter = filter.category(field, query.filter_value.as_deref().unwrap_or_default());
        }
        Ok(filter)
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.matches_search(document) && self.matches_category(document)
    }

    fn matches_search(&self, document: &Value) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        self.search_fields.iter().any(|field| {
            lookup_path(document, field)
                .and_then(value_as_text)
                .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
        })
    }

    fn matches_category(&self, document: &Value) -> bool {
        let Some((field, expected)) = &self.category else {
            return true;
        };
        lookup_path(document, field)
            .and_then(value_as_text)
            .is_some_and(|actual| &actual == expected)
    }
}

/// Newest `createdAt` first; undated documents last, ties broken by `id`.
pub fn sort_newest_first(documents: &mut [Value]) {
    let created = |document: &Value| {
        document
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    };
    let id = |document: &Value| document.get("id").and_then(value_as_text);
    documents.sort_by(|a, b| created(b).cmp(&created(a)).then_with(|| id(a).cmp(&id(b))));
}

/// 1-based page windowing. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, page: Option<usize>, page_size: Option<usize>) -> Page<T> {
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    let total = items.len();
    let total_pages = total.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        pagination: Pagination {
            page,
            page_size,
            total,
            total_pages,
        },
    }
}
