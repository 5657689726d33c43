//! Row records exchanged with the backend.
//!
//! Field names follow the Rust side; `#[serde(rename)]` maps them onto the
//! backend's column names. Identifiers arrive as numbers or strings depending
//! on the table, so they are normalized to `String` on the way in.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

pub type RowId = String;

/// Product record. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RowId,
    #[serde(rename = "nombre", default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(rename = "marca", default, deserialize_with = "string_or_empty")]
    pub brand: String,
    #[serde(rename = "imagen", default)]
    pub image: Option<String>,
    #[serde(rename = "ingredientes", default)]
    pub ingredients: Option<String>,
    #[serde(rename = "informacion", default)]
    pub info: Option<String>,
    #[serde(rename = "valoracion", default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RowId,
    #[serde(rename = "producto", deserialize_with = "deserialize_id")]
    pub product_id: RowId,
    #[serde(rename = "usuario_id", deserialize_with = "deserialize_id")]
    pub user_id: RowId,
    #[serde(rename = "calificacion")]
    pub rating: i32,
    #[serde(rename = "nota", default, deserialize_with = "string_or_empty")]
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// A named list owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserList {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RowId,
    #[serde(rename = "nombre", default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(rename = "usuario_id", deserialize_with = "deserialize_id")]
    pub user_id: RowId,
    pub created_at: DateTime<Utc>,
}

/// Join record between a list and a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMembership {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RowId,
    #[serde(rename = "lista_id", deserialize_with = "deserialize_id")]
    pub list_id: RowId,
    #[serde(rename = "producto_id", deserialize_with = "deserialize_id")]
    pub product_id: RowId,
}

/// The signed-in user as reported by the auth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RowId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Row of the user profile table, keyed by the auth user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RowId,
    #[serde(rename = "nombre", default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(rename = "fe_nac", default)]
    pub birth_date: Option<String>,
    #[serde(rename = "sexo", default)]
    pub sex: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileChanges<'a> {
    #[serde(rename = "nombre")]
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReview<'a> {
    #[serde(rename = "producto")]
    pub product_id: &'a str,
    #[serde(rename = "usuario_id")]
    pub user_id: &'a str,
    #[serde(rename = "calificacion")]
    pub rating: i32,
    #[serde(rename = "nota")]
    pub note: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewList<'a> {
    #[serde(rename = "nombre")]
    pub name: &'a str,
    #[serde(rename = "usuario_id")]
    pub user_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMembership<'a> {
    #[serde(rename = "lista_id")]
    pub list_id: &'a str,
    #[serde(rename = "producto_id")]
    pub product_id: &'a str,
}

/// Output of the camera's barcode reader.
///
/// `data` is handed to navigation untouched; nothing here parses barcodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeScan {
    pub symbology: String,
    pub data: String,
}

impl BarcodeScan {
    /// Route parameters for the results screen.
    pub fn route_params(&self) -> Vec<(&'static str, String)> {
        vec![("barcode", self.data.clone())]
    }
}

/// Accepts `7`, `"7"` or a UUID string and yields the textual form.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<RowId, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("identifier must be a string or number, got {other}"))),
    }
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

