//! Contract for the hosted backend-as-a-service.
//!
//! The crate never talks to the network itself. Hosts hand in a [`Backend`]
//! (row storage plus the auth session) and every component receives it
//! explicitly, so tests run against [`crate::memory_backend::InMemoryBackend`].

use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{BackendError, CoreError, CoreResult};
use crate::models::User;

/// One row as a JSON object keyed by column name.
pub type Row = JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, JsonValue),
    In(String, Vec<JsonValue>),
    /// Case-insensitive substring match on the literal needle. Backends that
    /// translate it to SQL `ilike` go through [`like_pattern`], which escapes
    /// the needle's own `%` and `_`.
    ILike(String, String),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) | Filter::ILike(c, _) => c,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let Some(cell) = row.get(self.column()) else {
            return false;
        };
        match self {
            Filter::Eq(_, value) => loose_eq(cell, value),
            Filter::In(_, values) => values.iter().any(|v| loose_eq(cell, v)),
            Filter::ILike(_, needle) => cell
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A `select` request: `select(table, columns, filters, order, limit)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn in_list<V: Into<JsonValue>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.filters.push(Filter::ILike(column.to_string(), needle.to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order { column: column.to_string(), ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub trait Backend: Send + Sync {
    fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError>;

    /// Inserts `record` and returns the stored row, including the
    /// backend-assigned `id` and `created_at`.
    fn insert(&self, table: &str, record: Row) -> Result<Row, BackendError>;

    /// Sets the columns present in `changes` on every row matching `filters`.
    fn update(&self, table: &str, changes: Row, filters: &[Filter]) -> Result<(), BackendError>;

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;

    /// The user of the current auth session, `None` when signed out.
    fn current_user(&self) -> Result<Option<User>, BackendError>;
}

impl<T: Backend + ?Sized> Backend for std::sync::Arc<T> {
    fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        (**self).select(query)
    }

    fn insert(&self, table: &str, record: Row) -> Result<Row, BackendError> {
        (**self).insert(table, record)
    }

    fn update(&self, table: &str, changes: Row, filters: &[Filter]) -> Result<(), BackendError> {
        (**self).update(table, changes, filters)
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        (**self).delete(table, filters)
    }

    fn current_user(&self) -> Result<Option<User>, BackendError> {
        (**self).current_user()
    }
}

/// `%needle%` with the needle's `\`, `%` and `_` escaped, for SQL `ilike`.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// The user of the current session, or `AuthRequired`.
pub(crate) fn session_user<B: Backend + ?Sized>(backend: &B) -> CoreResult<User> {
    backend.current_user()?.ok_or(CoreError::AuthRequired)
}

pub(crate) fn encode_row<T: Serialize>(table: &str, record: &T) -> Result<Row, BackendError> {
    serde_json::to_value(record)
        .map_err(|e| BackendError::new(format!("could not encode row for {table}: {e}")))
}

pub(crate) fn decode_row<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, BackendError> {
    serde_json::from_value(row)
        .map_err(|e| BackendError::new(format!("malformed row in {table}: {e}")))
}

pub(crate) fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Equality that treats `7` and `"7"` as the same identifier.
pub(crate) fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::String(x), JsonValue::Number(n)) | (JsonValue::Number(n), JsonValue::String(x)) => {
            *x == n.to_string()
        }
        _ => a == b,
    }
}

/// Ordering used for `order(column)`; nulls sort first.
pub(crate) fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Less,
        (_, JsonValue::Null) => Ordering::Greater,
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
