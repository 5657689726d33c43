//! Product detail composition.
//!
//! The product, its reviews and the user's lists are fetched independently
//! and merged client-side into a [`ProductDetailViewModel`]. Nothing is
//! patched in place after a write: the backend assigns review ids and
//! timestamps, so every successful write is followed by a full re-fetch.

use std::collections::HashSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::backend::{decode_row, decode_rows, encode_row, session_user, Backend, Query};
use crate::config::{CoreConfig, TableNames};
use crate::detail_screen::DetailScreen;
use crate::error::{CoreError, CoreResult};
use crate::lists::lists_of;
use crate::models::{ListMembership, NewMembership, NewReview, Product, Review, RowId, User, UserList};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Placeholder shown when a product has no reviews.
pub const NO_RATING: &str = "—";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetailViewModel {
    pub product: Product,
    /// Most recent first.
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
    pub review_count: usize,
    pub lists: ListOptions,
}

impl ProductDetailViewModel {
    pub fn average_label(&self) -> String {
        format_rating(self.average_rating)
    }

    /// Lists that already contain this product.
    pub fn added_list_ids(&self) -> HashSet<&str> {
        match &self.lists {
            ListOptions::SignedOut => HashSet::new(),
            ListOptions::Available(options) => options
                .iter()
                .filter(|o| o.already_added)
                .map(|o| o.list.id.as_str())
                .collect(),
        }
    }
}

/// "Add to list" choices. Signed out is distinct from having no lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "options")]
pub enum ListOptions {
    SignedOut,
    Available(Vec<ListOption>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOption {
    pub list: UserList,
    pub already_added: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub average: Option<f64>,
    pub count: usize,
    pub label: String,
}

impl ReviewSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        let average = average_rating(ratings.iter().copied());
        Self { average, count: ratings.len(), label: format_rating(average) }
    }
}

/// Mean review rating rounded to one decimal, `None` without reviews.
pub fn compute_average_rating(reviews: &[Review]) -> Option<f64> {
    average_rating(reviews.iter().map(|r| r.rating))
}

pub fn average_rating(ratings: impl IntoIterator<Item = i32>) -> Option<f64> {
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0u32), |(sum, count), r| (sum + i64::from(r), count + 1));
    if count == 0 {
        return None;
    }
    let mean = sum as f64 / f64::from(count);
    Some((mean * 10.0).round() / 10.0)
}

pub fn format_rating(average: Option<f64>) -> String {
    match average {
        Some(avg) => format!("{avg:.1}"),
        None => NO_RATING.to_string(),
    }
}

pub fn validate_rating(rating: i32) -> CoreResult<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )))
    }
}

pub struct DetailComposer<B: Backend> {
    backend: B,
    tables: TableNames,
}

impl<B: Backend> DetailComposer<B> {
    pub fn new(backend: B, config: &CoreConfig) -> Self {
        Self { backend, tables: config.tables.clone() }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The signed-in user, or `AuthRequired`.
    pub fn session_user(&self) -> CoreResult<User> {
        session_user(&self.backend)
    }

    pub fn load_product(&self, product_id: &str) -> CoreResult<Product> {
        let query = Query::from(&self.tables.products).eq("id", product_id).limit(1);
        let row = self
            .backend
            .select(&query)?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("product {product_id}")))?;
        Ok(decode_row(&self.tables.products, row)?)
    }

    /// Reviews of `product_id`, most recent first.
    pub fn load_reviews(&self, product_id: &str) -> CoreResult<Vec<Review>> {
        let query = Query::from(&self.tables.reviews)
            .eq("producto", product_id)
            .order("created_at", false);
        let rows = self.backend.select(&query)?;
        Ok(decode_rows(&self.tables.reviews, rows)?)
    }

    /// Lists owned by the signed-in user, newest first.
    pub fn load_user_lists(&self) -> CoreResult<Vec<UserList>> {
        let user = self.session_user()?;
        lists_of(&self.backend, &self.tables, &user.id)
    }

    /// Ids of the given lists that already contain `product_id`.
    pub fn memberships(&self, product_id: &str, lists: &[UserList]) -> CoreResult<HashSet<RowId>> {
        if lists.is_empty() {
            return Ok(HashSet::new());
        }
        let query = Query::from(&self.tables.list_products)
            .eq("producto_id", product_id)
            .in_list("lista_id", lists.iter().map(|l| l.id.clone()));
        let rows = self.backend.select(&query)?;
        let joins: Vec<ListMembership> = decode_rows(&self.tables.list_products, rows)?;
        Ok(joins.into_iter().map(|j| j.list_id).collect())
    }

    /// Backend constraint errors come back verbatim.
    pub fn add_to_list(&self, list_id: &str, product_id: &str) -> CoreResult<ListMembership> {
        let record = encode_row(&self.tables.list_products, &NewMembership { list_id, product_id })?;
        let row = self.backend.insert(&self.tables.list_products, record)?;
        info!("Added product {product_id} to list {list_id}");
        Ok(decode_row(&self.tables.list_products, row)?)
    }

    /// Validates, inserts, then re-fetches the product's reviews.
    ///
    /// Out-of-range ratings fail before the backend is contacted. Empty
    /// notes are allowed.
    pub fn submit_review(&self, product_id: &str, rating: i32, note: &str) -> CoreResult<Vec<Review>> {
        validate_rating(rating)?;
        let user = self.session_user()?;

        let record = encode_row(
            &self.tables.reviews,
            &NewReview { product_id, user_id: &user.id, rating, note },
        )?;
        self.backend.insert(&self.tables.reviews, record)?;
        info!("Review submitted for product {product_id}");

        self.load_reviews(product_id)
    }

    /// Builds the full detail view model.
    pub fn compose(&self, product_id: &str) -> CoreResult<ProductDetailViewModel> {
        let product = self.load_product(product_id)?;
        let reviews = self.load_reviews(product_id)?;

        let lists = match self.backend.current_user()? {
            None => ListOptions::SignedOut,
            Some(user) => {
                let lists = lists_of(&self.backend, &self.tables, &user.id)?;
                let added = self.memberships(product_id, &lists)?;
                ListOptions::Available(
                    lists
                        .into_iter()
                        .map(|list| {
                            let already_added = added.contains(&list.id);
                            ListOption { list, already_added }
                        })
                        .collect(),
                )
            }
        };

        Ok(ProductDetailViewModel {
            average_rating: compute_average_rating(&reviews),
            review_count: reviews.len(),
            product,
            reviews,
            lists,
        })
    }

    /// Loads `screen`'s product and applies the result if still wanted.
    pub fn refresh(&self, screen: &mut DetailScreen) -> bool {
        let ticket = screen.begin_load();
        let result = self.compose(ticket.product_id());
        if let Err(e) = &result {
            warn!("Loading product {} failed: {e}", ticket.product_id());
        }
        screen.complete(&ticket, result)
    }

    /// Submits a review from a detail screen.
    ///
    /// Validation and sign-in problems come back to the caller as inline
    /// errors and leave the screen alone. Backend failures raise the screen's
    /// alert. Nothing is retried.
    pub fn submit_review_on(&self, screen: &mut DetailScreen, rating: i32, note: &str) -> CoreResult<()> {
        let product_id = screen.product_id().to_string();
        let outcome = self.submit_review(&product_id, rating, note).map(|_| ());
        self.finish_write(screen, outcome)
    }

    pub fn add_to_list_on(&self, screen: &mut DetailScreen, list_id: &str) -> CoreResult<()> {
        let product_id = screen.product_id().to_string();
        let outcome = self.add_to_list(list_id, &product_id).map(|_| ());
        self.finish_write(screen, outcome)
    }

    fn finish_write(&self, screen: &mut DetailScreen, outcome: CoreResult<()>) -> CoreResult<()> {
        match outcome {
            Ok(()) => {
                self.refresh(screen);
                Ok(())
            }
            Err(err @ CoreError::Backend(_)) => {
                warn!("Write on product {} failed: {err}", screen.product_id());
                screen.write_failed(&err);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
