//! Loop queries: fetch every page of a search and merge them.
//!
//! The query is sent repeatedly with `limit <page_size> skip <offset>`
//! appended until a short page comes back, the reported total is reached, or
//! the caller's cap is hit. Pages are merged into one [`DslResult`].

use crate::client::DslClient;
use crate::error::{DslError, Result};
use crate::rate_limit::RateLimiter;
use crate::result::{DslResult, ERRORS_KEY, STATS_KEY, WARNINGS_KEY};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Largest `limit` the DSL accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

/// Largest `skip` the DSL accepts.
pub const MAX_SKIP: u64 = 50_000;

/// Pause between page requests unless configured otherwise.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(1500);

/// Options for [`DslClient::query_iterative_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOptions {
    /// Records per page, between 1 and 1000.
    pub page_size: u32,
    /// Stop once this many records have been collected.
    pub max_records: Option<u64>,
    /// Minimum time between two page requests.
    pub pause: Duration,
    /// Give up when the whole loop takes longer than this.
    pub deadline: Option<Duration>,
    /// Return the records fetched so far when the skip window is reached,
    /// instead of failing with [`DslError::Truncated`].
    pub allow_truncation: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_records: None,
            pause: DEFAULT_PAUSE,
            deadline: None,
            allow_truncation: false,
        }
    }
}

impl LoopOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn max_records(mut self, max_records: u64) -> Self {
        self.max_records = Some(max_records);
        self
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn allow_truncation(mut self, allow: bool) -> Self {
        self.allow_truncation = allow;
        self
    }
}

#[derive(Debug)]
struct PaginationState {
    offset: u64,
    accumulated: Vec<DslResult>,
    records: u64,
    done: bool,
}

impl DslClient {
    /// Run a loop query with default options.
    ///
    /// The query must not contain `limit` or `skip`; they are added per page.
    pub async fn query_iterative(&self, query: &str) -> Result<DslResult> {
        self.query_iterative_with(query, &LoopOptions::default())
            .await
    }

    /// Run a loop query.
    ///
    /// Any failing page aborts the whole loop and partial results are dropped.
    /// Running into the server's skip window with records still outstanding
    /// fails with [`DslError::Truncated`] unless
    /// [`LoopOptions::allow_truncation`] is set.
    pub async fn query_iterative_with(
        &self,
        query: &str,
        options: &LoopOptions,
    ) -> Result<DslResult> {
        let query = query.trim();
        if contains_pagination_clause(query) {
            return Err(DslError::InvalidQuery(
                "loop queries must not contain limit/skip clauses".to_string(),
            ));
        }
        if options.page_size == 0 || options.page_size > MAX_PAGE_SIZE {
            return Err(DslError::InvalidQuery(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, options.page_size
            )));
        }

        let page_size = u64::from(options.page_size);
        let source = return_source(query);
        let mut limiter = RateLimiter::new(options.pause);
        let started = Instant::now();

        let mut state = PaginationState {
            offset: 0,
            accumulated: Vec::new(),
            records: 0,
            done: false,
        };
        let mut record_key: Option<String> = None;
        let mut total: Option<u64> = None;

        while !state.done {
            if state.offset >= MAX_SKIP {
                if !options.allow_truncation {
                    return Err(DslError::Truncated {
                        fetched: state.records,
                        total,
                    });
                }
                tracing::warn!(
                    records = state.records,
                    total,
                    "reached the {} record window, returning a truncated result",
                    MAX_SKIP
                );
                break;
            }

            limiter.acquire().await;
            let page_query = paginate(query, options.page_size, state.offset);
            let page = match options.deadline {
                Some(deadline) => {
                    let remaining = deadline
                        .checked_sub(started.elapsed())
                        .ok_or(DslError::Timeout(deadline))?;
                    tokio::time::timeout(remaining, self.query(&page_query))
                        .await
                        .map_err(|_| DslError::Timeout(deadline))??
                }
                None => self.query(&page_query).await?,
            };

            if page.is_error() {
                return Err(DslError::Query(page.error_message().unwrap_or_default()));
            }

            if record_key.is_none() {
                record_key = find_record_key(&page, source.as_deref());
            }
            let count = record_key
                .as_deref()
                .and_then(|key| page.count(key))
                .unwrap_or(0) as u64;
            if state.accumulated.is_empty() {
                total = page.total_count();
            }

            state.records += count;
            state.offset += page_size;
            tracing::debug!(
                offset = state.offset - page_size,
                count,
                records = state.records,
                total,
                "fetched loop page"
            );
            state.accumulated.push(page);

            state.done = count < page_size
                || total.is_some_and(|t| state.records >= t)
                || options.max_records.is_some_and(|m| state.records >= m);
        }

        let mut merged = merge_pages(state.accumulated, record_key.as_deref());
        if let (Some(max), Some(key)) = (options.max_records, record_key.as_deref()) {
            merged = truncate_records(merged, key, max);
        }
        tracing::info!(
            records = state.records,
            pages = state.offset / page_size,
            "loop query complete"
        );
        Ok(merged)
    }
}

/// Append pagination clauses to a query.
pub fn paginate(query: &str, limit: u32, skip: u64) -> String {
    format!("{} limit {} skip {}", query.trim_end(), limit, skip)
}

/// Whether the query already has a top-level `limit` or `skip` keyword.
///
/// Quoted strings are ignored, so `for "speed limit"` does not count.
pub fn contains_pagination_clause(query: &str) -> bool {
    words(query)
        .iter()
        .any(|w| w.eq_ignore_ascii_case("limit") || w.eq_ignore_ascii_case("skip"))
}

/// Source named after the `return` keyword, e.g. `publications` in
/// `return publications[id+title]`.
pub fn return_source(query: &str) -> Option<String> {
    let words = words(query);
    let pos = words.iter().position(|w| w.eq_ignore_ascii_case("return"))?;
    let next = words.get(pos + 1)?;
    let name: String = next
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

/// Unquoted whitespace-separated words of a query.
fn words(query: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in query.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
            continue;
        }
        if c == '"' || c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push(&query[s..i]);
            }
            in_quotes = c == '"';
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&query[s..]);
    }
    out
}

fn find_record_key(page: &DslResult, source: Option<&str>) -> Option<String> {
    if let Some(source) = source {
        if page.count(source).is_some() {
            return Some(source.to_string());
        }
    }
    page.data()
        .iter()
        .find(|(k, v)| v.is_array() && !is_reserved_key(k))
        .map(|(k, _)| k.clone())
}

fn is_reserved_key(key: &str) -> bool {
    matches!(key, STATS_KEY | WARNINGS_KEY | ERRORS_KEY)
}

/// Merge loop pages in request order.
///
/// Records under `record_key` and any `_warnings` are concatenated; every
/// other field keeps the value from the first page.
fn merge_pages(pages: Vec<DslResult>, record_key: Option<&str>) -> DslResult {
    let mut pages = pages.into_iter();
    let Some(first) = pages.next() else {
        return DslResult::new(200, Default::default());
    };
    let status = first.status();
    let mut data = first.into_data();

    for page in pages {
        for (key, value) in page.into_data() {
            let concatenate = record_key == Some(key.as_str()) || key == WARNINGS_KEY;
            match data.get_mut(&key) {
                Some(Value::Array(existing)) if concatenate => {
                    if let Value::Array(items) = value {
                        existing.extend(items);
                    }
                }
                Some(_) => {}
                None => {
                    data.insert(key, value);
                }
            }
        }
    }

    DslResult::new(status, data)
}

fn truncate_records(result: DslResult, key: &str, max: u64) -> DslResult {
    let status = result.status();
    let mut data = result.into_data();
    if let Some(Value::Array(items)) = data.get_mut(key) {
        items.truncate(usize::try_from(max).unwrap_or(usize::MAX));
    }
    DslResult::new(status, data)
}
