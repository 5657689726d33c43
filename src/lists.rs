//! Favourite lists: create, delete and browse.

use std::collections::HashMap;

use log::info;

use crate::backend::{decode_row, decode_rows, encode_row, session_user, Backend, Filter, Query};
use crate::config::{CoreConfig, TableNames};
use crate::error::{CoreError, CoreResult};
use crate::models::{ListMembership, NewList, Product, UserList};

pub struct ListManager<B: Backend> {
    backend: B,
    tables: TableNames,
}

impl<B: Backend> ListManager<B> {
    pub fn new(backend: B, config: &CoreConfig) -> Self {
        Self { backend, tables: config.tables.clone() }
    }

    /// The signed-in user's lists, newest first.
    pub fn fetch_lists(&self) -> CoreResult<Vec<UserList>> {
        let user = session_user(&self.backend)?;
        lists_of(&self.backend, &self.tables, &user.id)
    }

    /// Creates a list named `name` (trimmed) for the signed-in user.
    pub fn create_list(&self, name: &str) -> CoreResult<UserList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("list name cannot be empty".to_string()));
        }
        let user = session_user(&self.backend)?;

        let record = encode_row(&self.tables.lists, &NewList { name, user_id: &user.id })?;
        let row = self.backend.insert(&self.tables.lists, record)?;
        let list: UserList = decode_row(&self.tables.lists, row)?;
        info!("Created list {} ({})", list.name, list.id);
        Ok(list)
    }

    /// Deletes the list and its product links.
    pub fn delete_list(&self, list_id: &str) -> CoreResult<()> {
        self.backend
            .delete(&self.tables.list_products, &[Filter::eq("lista_id", list_id)])?;
        self.backend.delete(&self.tables.lists, &[Filter::eq("id", list_id)])?;
        info!("Deleted list {list_id}");
        Ok(())
    }

    pub fn remove_from_list(&self, list_id: &str, product_id: &str) -> CoreResult<()> {
        self.backend.delete(
            &self.tables.list_products,
            &[Filter::eq("lista_id", list_id), Filter::eq("producto_id", product_id)],
        )?;
        Ok(())
    }

    /// Products on a list, in the order they were added.
    ///
    /// Links pointing at products that no longer exist are skipped.
    pub fn list_products(&self, list_id: &str) -> CoreResult<Vec<Product>> {
        let links = Query::from(&self.tables.list_products).eq("lista_id", list_id);
        let links: Vec<ListMembership> =
            decode_rows(&self.tables.list_products, self.backend.select(&links)?)?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::from(&self.tables.products)
            .in_list("id", links.iter().map(|l| l.product_id.clone()));
        let products: Vec<Product> =
            decode_rows(&self.tables.products, self.backend.select(&query)?)?;
        let mut by_id: HashMap<String, Product> =
            products.into_iter().map(|p| (p.id.clone(), p)).collect();

        Ok(links
            .iter()
            .filter_map(|link| by_id.remove(&link.product_id))
            .collect())
    }
}

/// Lists owned by `user_id`, newest first.
pub(crate) fn lists_of<B: Backend + ?Sized>(
    backend: &B,
    tables: &TableNames,
    user_id: &str,
) -> CoreResult<Vec<UserList>> {
    let query = Query::from(&tables.lists)
        .eq("usuario_id", user_id)
        .order("created_at", false);
    Ok(decode_rows(&tables.lists, backend.select(&query)?)?)
}
