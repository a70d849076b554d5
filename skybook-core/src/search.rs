use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Paging, sorting and `LIKE`-style filters for list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl ListParams {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        match self.page_size {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(size) => size.min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or_default()
    }

    /// The requested sort column, if it is one of `allowed`.
    pub fn sort_column<'a>(&self, allowed: &[&'a str]) -> Option<&'a str> {
        let requested = self.sort_by.as_deref()?;
        allowed.iter().copied().find(|column| *column == requested)
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    pub fn with_filter(mut self, name: &str, pattern: &str) -> Self {
        self.filters.insert(name.to_string(), pattern.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Slice an already filtered and sorted result set.
    pub fn from_vec(items: Vec<T>, params: &ListParams) -> Self {
        let total_count = items.len() as i64;
        let data = items
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.page_size() as usize)
            .collect();
        Self {
            data,
            total_count,
            page: params.page(),
            page_size: params.page_size(),
        }
    }
}

/// SQL `LIKE` matching: `%` matches any run of characters, `_` exactly one.
pub fn like_matches(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    // matched[j] == pattern[..i] matches value[..j]
    let mut matched = vec![false; value.len() + 1];
    matched[0] = true;
    for p in &pattern {
        let mut next = vec![false; value.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=value.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1] && (*p == '_' || *p == value[j - 1]);
                }
            }
        }
        matched = next;
    }
    matched[value.len()]
}
