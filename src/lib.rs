//! # ClearLabel Core
//!
//! Client-side core of the ClearLabel product-scanning app. The UI stays in
//! the host (Flutter / React Native); this crate owns the two pieces with
//! actual logic in them:
//!
//! - **Search history** ([`history`]): recent queries, most recent first,
//!   no duplicates, bounded to [`config::HISTORY_CAPACITY`], persisted in
//!   LMDB across restarts.
//! - **Product detail composition** ([`composer`]): product, reviews and the
//!   user's list memberships fetched independently and merged into one view
//!   model, with the average rating derived client-side.
//!
//! Lists, the user's own reviews, product search and account settings live
//! in [`lists`], [`user_reviews`], [`search`] and [`account`]. The hosted backend is abstracted behind
//! [`backend::Backend`] and always passed in explicitly.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clearlabel_core::config::CoreConfig;
//! use clearlabel_core::history::HistoryStore;
//! use clearlabel_core::local_store::LmdbStore;
//!
//! let config = CoreConfig::default();
//! let store = LmdbStore::open("clearlabel").unwrap();
//! let history = HistoryStore::open(store, &config.history, Some("user-1"));
//!
//! history.record("cerave");
//! history.record("niacinamide");
//! assert_eq!(history.record("cerave"), vec!["cerave", "niacinamide"]);
//! ```
//!
//! ## FFI Functions
//!
//! Every function returns a JSON-encoded [`AppResponse`] that the caller
//! releases with [`free_response`]:
//!
//! - [`open_history`] - Open the history store (returns a handle)
//! - [`history_load`] - Re-read the persisted history
//! - [`history_record`] - Record a submitted query
//! - [`history_remove`] - Remove one query
//! - [`history_clear`] - Remove everything
//! - [`close_history`] - Flush and release the handle
//! - [`summarize_reviews`] - Average rating and count for a review array

pub mod account;
pub mod app_response;
pub mod backend;
pub mod composer;
pub mod config;
pub mod detail_screen;
pub mod error;
pub mod history;
pub mod lists;
pub mod local_store;
pub mod memory_backend;
pub mod models;
pub mod search;
pub mod user_reviews;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Deserialize;

use crate::app_response::AppResponse;
use crate::composer::ReviewSummary;
use crate::config::CoreConfig;
use crate::history::HistoryStore;
use crate::local_store::LmdbStore;

/// History store persisted on the device, as handed out over FFI.
pub type DeviceHistory = HistoryStore<LmdbStore>;

/// Opens the search history stored at `<path>.lmdb`.
///
/// # Parameters
///
/// * `path` - Null-terminated storage path (required)
/// * `config_json` - JSON [`CoreConfig`], may be null for defaults
/// * `user_id` - Signed-in user, may be null for the device-wide history
///
/// # Returns
///
/// A handle for the other `history_*` functions, or null on failure.
/// Release it with [`close_history`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn open_history(
    path: *const c_char,
    config_json: *const c_char,
    user_id: *const c_char,
) -> *mut DeviceHistory {
    let Some(path) = optional_c_str(path, "path") else {
        warn!("Null or invalid path passed to open_history");
        return std::ptr::null_mut();
    };

    let config = match optional_c_str(config_json, "config") {
        Some(json) => match CoreConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid config JSON: {e}");
                return std::ptr::null_mut();
            }
        },
        None => CoreConfig::default(),
    };
    let user_id = optional_c_str(user_id, "user_id");

    match LmdbStore::open(&path) {
        Ok(store) => {
            let history = HistoryStore::open(store, &config.history, user_id.as_deref());
            info!("✅ History opened under key '{}'", history.storage_key());
            Box::into_raw(Box::new(history))
        }
        Err(e) => {
            warn!("❌ Failed to open history store at {path}: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Re-reads the persisted history.
///
/// # Parameters
///
/// * `handle` - Handle returned by [`open_history`]
///
/// # Returns
///
/// `Ok` with the entries as a JSON array, most recent first. Unreadable
/// storage yields an empty array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn history_load(handle: *mut DeviceHistory) -> *const c_char {
    let history = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => return bad_request("Null handle passed to history_load"),
    };
    response_to_c_string(&AppResponse::json(&history.load()))
}

/// Records a submitted query. Blank queries leave the history unchanged.
///
/// # Parameters
///
/// * `handle` - Handle returned by [`open_history`]
/// * `query` - Null-terminated query, trimmed before recording
///
/// # Returns
///
/// `Ok` with the updated entries as a JSON array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn history_record(handle: *mut DeviceHistory, query: *const c_char) -> *const c_char {
    let history = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => return bad_request("Null handle passed to history_record"),
    };
    let query = match c_ptr_to_string(query, "query") {
        Ok(q) => q,
        Err(error_ptr) => return error_ptr,
    };
    response_to_c_string(&AppResponse::json(&history.record(&query)))
}

/// Removes one query from the history.
///
/// # Parameters
///
/// * `handle` - Handle returned by [`open_history`]
/// * `query` - Null-terminated query, matched exactly (no trimming)
///
/// # Returns
///
/// `Ok` with the remaining entries as a JSON array. Removing a query that
/// is not present is not an error.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn history_remove(handle: *mut DeviceHistory, query: *const c_char) -> *const c_char {
    let history = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => return bad_request("Null handle passed to history_remove"),
    };
    let query = match c_ptr_to_string(query, "query") {
        Ok(q) => q,
        Err(error_ptr) => return error_ptr,
    };
    response_to_c_string(&AppResponse::json(&history.remove(&query)))
}

/// Empties the history and deletes its persisted copy.
///
/// # Parameters
///
/// * `handle` - Handle returned by [`open_history`]
///
/// # Returns
///
/// `Ok` with an empty JSON array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn history_clear(handle: *mut DeviceHistory) -> *const c_char {
    let history = match unsafe { handle.as_ref() } {
        Some(h) => h,
        None => return bad_request("Null handle passed to history_clear"),
    };
    response_to_c_string(&AppResponse::json(&history.clear()))
}

/// Flushes and frees the handle. The pointer is invalid afterwards.
///
/// # Parameters
///
/// * `handle` - Handle returned by [`open_history`]
///
/// # Returns
///
/// `Ok` with a confirmation message, or `StorageError` if the flush failed.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_history(handle: *mut DeviceHistory) -> *const c_char {
    if handle.is_null() {
        return bad_request("Null handle passed to close_history");
    }

    let history = unsafe { Box::from_raw(handle) };
    let mut store = history.into_store();
    match store.close() {
        Ok(()) => response_to_c_string(&AppResponse::success("History closed successfully")),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

#[derive(Deserialize)]
struct RatedReview {
    #[serde(rename = "calificacion", alias = "rating")]
    rating: i32,
}

/// Average rating and count for a JSON array of reviews.
///
/// Each element needs a `calificacion` (or `rating`) field; other fields are
/// ignored.
///
/// # Parameters
///
/// * `reviews_json` - Null-terminated JSON array of reviews
///
/// # Returns
///
/// `Ok` with `{average, count, label}`; `label` is `"—"` for an empty array.
/// Malformed JSON gives `SerializationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn summarize_reviews(reviews_json: *const c_char) -> *const c_char {
    let json = match c_ptr_to_string(reviews_json, "reviews JSON") {
        Ok(json) => json,
        Err(error_ptr) => return error_ptr,
    };

    let reviews: Vec<RatedReview> = match serde_json::from_str(&json) {
        Ok(r) => r,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
    response_to_c_string(&AppResponse::json(&ReviewSummary::from_ratings(&ratings)))
}

/// Releases a string returned by any function of this library.
///
/// # Parameters
///
/// * `ptr` - Response pointer; null is ignored
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

fn bad_request(msg: &str) -> *const c_char {
    response_to_c_string(&AppResponse::BadRequest(msg.to_string()))
}

fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// `None` for null pointers and invalid UTF-8.
fn optional_c_str(ptr: *const c_char, field_name: &str) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Some(s.to_string()),
        Err(e) => {
            warn!("Invalid UTF-8 in {field_name}: {e}");
            None
        }
    }
}
