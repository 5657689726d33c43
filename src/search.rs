//! Product search by name, feeding the recent-search history.

use std::collections::HashMap;

use serde::Serialize;

use crate::backend::{decode_rows, Backend, Query};
use crate::config::{CoreConfig, TableNames};
use crate::error::CoreResult;
use crate::history::HistoryStore;
use crate::local_store::KeyValueStore;
use crate::models::Product;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// History after recording the query.
    pub history: Vec<String>,
    pub products: Vec<Product>,
}

pub struct ProductSearch<B: Backend> {
    backend: B,
    tables: TableNames,
    limit: usize,
    recommended: Vec<String>,
}

impl<B: Backend> ProductSearch<B> {
    pub fn new(backend: B, config: &CoreConfig) -> Self {
        Self {
            backend,
            tables: config.tables.clone(),
            limit: config.search.result_limit,
            recommended: config.search.recommended_ids.clone(),
        }
    }

    /// Case-insensitive name match on the literal query. Blank queries return nothing without
    /// contacting the backend.
    pub fn search(&self, query: &str) -> CoreResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let select = Query::from(&self.tables.products)
            .ilike("nombre", query)
            .order("nombre", true)
            .limit(self.limit);
        Ok(decode_rows(&self.tables.products, self.backend.select(&select)?)?)
    }

    /// Records `query` in `history`, then searches.
    ///
    /// The history is updated even if the backend call fails.
    pub fn submit<S: KeyValueStore>(
        &self,
        history: &HistoryStore<S>,
        query: &str,
    ) -> CoreResult<SearchOutcome> {
        let history = history.record(query);
        let products = self.search(query)?;
        Ok(SearchOutcome { history, products })
    }

    /// The configured recommendations, in configured order.
    pub fn recommendations(&self) -> CoreResult<Vec<Product>> {
        self.products_by_id(&self.recommended)
    }

    /// Products for `ids`, in the order given. Unknown ids are skipped.
    pub fn products_by_id(&self, ids: &[String]) -> CoreResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = Query::from(&self.tables.products).in_list("id", ids.iter().cloned());
        let products: Vec<Product> =
            decode_rows(&self.tables.products, self.backend.select(&select)?)?;
        let mut by_id: HashMap<String, Product> =
            products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
