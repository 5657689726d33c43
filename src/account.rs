//! Profile settings and account removal.

use log::{info, warn};
use serde_json::Value as JsonValue;

use crate::backend::{decode_rows, encode_row, session_user, Backend, Filter, Query};
use crate::config::{CoreConfig, TableNames};
use crate::error::{CoreError, CoreResult};
use crate::lists::lists_of;
use crate::models::{Profile, ProfileChanges};

pub struct AccountSettings<B: Backend> {
    backend: B,
    tables: TableNames,
}

impl<B: Backend> AccountSettings<B> {
    pub fn new(backend: B, config: &CoreConfig) -> Self {
        Self { backend, tables: config.tables.clone() }
    }

    /// The session user's profile row. `None` when it was never created.
    pub fn profile(&self) -> CoreResult<Option<Profile>> {
        let user = session_user(&self.backend)?;
        let query = Query::from(&self.tables.users).eq("id", user.id.as_str()).limit(1);
        let profiles: Vec<Profile> = decode_rows(&self.tables.users, self.backend.select(&query)?)?;
        Ok(profiles.into_iter().next())
    }

    /// Name shown in settings; empty without a profile.
    pub fn display_name(&self) -> CoreResult<String> {
        Ok(self.profile()?.map(|p| p.name).unwrap_or_default())
    }

    /// Stores `name` trimmed and returns what was stored.
    pub fn rename(&self, name: &str) -> CoreResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("name cannot be empty".to_string()));
        }
        let user = session_user(&self.backend)?;

        let changes = encode_row(&self.tables.users, &ProfileChanges { name })?;
        self.backend
            .update(&self.tables.users, changes, &[Filter::eq("id", user.id.as_str())])?;
        info!("Renamed profile {}", user.id);
        Ok(name.to_string())
    }

    /// Deletes the user's reviews, lists (with their product links) and
    /// finally the profile row. Stops at the first failure.
    ///
    /// Ending the auth session is left to the host.
    pub fn delete_account(&self) -> CoreResult<()> {
        let user = session_user(&self.backend)?;
        let owner = [Filter::eq("usuario_id", user.id.as_str())];

        self.backend.delete(&self.tables.reviews, &owner)?;

        let lists = lists_of(&self.backend, &self.tables, &user.id)?;
        if !lists.is_empty() {
            let ids: Vec<JsonValue> = lists.into_iter().map(|l| JsonValue::String(l.id)).collect();
            self.backend
                .delete(&self.tables.list_products, &[Filter::In("lista_id".to_string(), ids)])?;
        }
        self.backend.delete(&self.tables.lists, &owner)?;

        if let Err(e) = self
            .backend
            .delete(&self.tables.users, &[Filter::eq("id", user.id.as_str())])
        {
            warn!("Failed to delete profile {}: {e}", user.id);
            return Err(e.into());
        }
        info!("Deleted account {}", user.id);
        Ok(())
    }
}
