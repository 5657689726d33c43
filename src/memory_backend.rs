//! In-process [`Backend`] with the same query semantics as the hosted one.
//!
//! Used by the test suite and by hosts running without network access.
//! Tables are created on first write; failures can be injected per table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::debug;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::backend::{compare_values, loose_eq, Backend, Filter, Query, Row};
use crate::error::BackendError;
use crate::models::User;

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    unique: HashMap<String, Vec<Vec<String>>>,
    failures: HashMap<String, BackendError>,
    user: Option<User>,
    last_created: Option<DateTime<Utc>>,
    calls: usize,
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `row` verbatim, bypassing constraints and call counting.
    pub fn seed(&self, table: &str, row: Row) {
        self.lock().tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn sign_in(&self, user: User) {
        self.lock().user = Some(user);
    }

    pub fn sign_out(&self) {
        self.lock().user = None;
    }

    /// Rejects inserts that repeat an existing combination of `columns`.
    pub fn add_unique_constraint(&self, table: &str, columns: &[&str]) {
        self.lock()
            .unique
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
    }

    /// Every following call touching `table` fails with `error`.
    pub fn fail_table(&self, table: &str, error: BackendError) {
        self.lock().failures.insert(table.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Number of row and auth calls served so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }
}

impl State {
    fn check(&mut self, table: &str) -> Result<(), BackendError> {
        self.calls += 1;
        match self.failures.get(table) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(stamp);
        stamp
    }

    fn violates_unique(&self, table: &str, record: &Map<String, JsonValue>) -> Option<String> {
        let constraints = self.unique.get(table)?;
        let rows = self.tables.get(table)?;
        constraints.iter().find_map(|columns| {
            let clash = rows.iter().any(|row| {
                columns.iter().all(|c| match (row.get(c), record.get(c)) {
                    (Some(a), Some(b)) => loose_eq(a, b),
                    _ => false,
                })
            });
            clash.then(|| format!("{}_{}_key", table, columns.join("_")))
        })
    }
}

impl Backend for InMemoryBackend {
    fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let mut state = self.lock();
        state.check(&query.table)?;

        let mut rows: Vec<Row> = state
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.column).unwrap_or(&JsonValue::Null),
                    b.get(&order.column).unwrap_or(&JsonValue::Null),
                );
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        if !query.columns.is_empty() {
            rows = rows
                .into_iter()
                .map(|row| {
                    let projected: Map<String, JsonValue> = query
                        .columns
                        .iter()
                        .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                        .collect();
                    JsonValue::Object(projected)
                })
                .collect();
        }

        debug!("select {} -> {} rows", query.table, rows.len());
        Ok(rows)
    }

    fn insert(&self, table: &str, record: Row) -> Result<Row, BackendError> {
        let mut state = self.lock();
        state.check(table)?;

        let JsonValue::Object(mut record) = record else {
            return Err(BackendError::new(format!("insert into {table} expects an object")));
        };

        if let Some(constraint) = state.violates_unique(table, &record) {
            return Err(BackendError::with_code(
                format!("duplicate key value violates unique constraint \"{constraint}\""),
                "23505",
            ));
        }

        record
            .entry("id")
            .or_insert_with(|| JsonValue::String(Uuid::new_v4().to_string()));
        if !record.contains_key("created_at") {
            let stamp = state.next_timestamp();
            record.insert(
                "created_at".to_string(),
                JsonValue::String(stamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }

        let row = JsonValue::Object(record);
        state.tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    fn update(&self, table: &str, changes: Row, filters: &[Filter]) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.check(table)?;

        let JsonValue::Object(changes) = changes else {
            return Err(BackendError::new(format!("update of {table} expects an object")));
        };

        let mut updated = 0;
        for row in state.tables.get_mut(table).into_iter().flatten() {
            if !filters.iter().all(|f| f.matches(row)) {
                continue;
            }
            if let JsonValue::Object(columns) = row {
                columns.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
                updated += 1;
            }
        }
        debug!("update {table} -> {updated} rows changed");
        Ok(())
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.check(table)?;

        if let Some(rows) = state.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|row| !filters.iter().all(|f| f.matches(row)));
            debug!("delete {table} -> {} rows removed", before - rows.len());
        }
        Ok(())
    }

    fn current_user(&self) -> Result<Option<User>, BackendError> {
        let mut state = self.lock();
        state.calls += 1;
        Ok(state.user.clone())
    }
}
