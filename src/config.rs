//! Runtime configuration.
//!
//! Everything here has a default matching the production app, so hosts
//! usually pass `{}` (or nothing) over FFI and only override what differs.

use serde::{Deserialize, Serialize};

/// Number of recent searches kept.
pub const HISTORY_CAPACITY: usize = 10;

/// Storage key the serialized history lives under.
pub const HISTORY_STORAGE_KEY: &str = "search_history";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub history: HistoryConfig,
    pub tables: TableNames,
    pub search: SearchConfig,
}

impl CoreConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub storage_key: String,
    /// Keep one history per signed-in user instead of one per device.
    pub scope_by_user: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: HISTORY_CAPACITY,
            storage_key: HISTORY_STORAGE_KEY.to_string(),
            scope_by_user: true,
        }
    }
}

impl HistoryConfig {
    pub fn key_for(&self, user_id: Option<&str>) -> String {
        match user_id {
            Some(id) if self.scope_by_user && !id.is_empty() => {
                format!("{}:{}", self.storage_key, id)
            }
            _ => self.storage_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub products: String,
    pub reviews: String,
    pub lists: String,
    pub list_products: String,
    pub users: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            products: "Productos".to_string(),
            reviews: "Resenas".to_string(),
            lists: "Listas".to_string(),
            list_products: "ListaProductos".to_string(),
            users: "Usuarios".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub result_limit: usize,
    /// Products shown on the recommendations screen, in display order.
    pub recommended_ids: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { result_limit: 10, recommended_ids: Vec::new() }
    }
}
