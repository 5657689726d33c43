//! The signed-in user's own reviews, across products.

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::backend::{decode_rows, session_user, Backend, Filter, Query};
use crate::config::{CoreConfig, TableNames};
use crate::error::CoreResult;
use crate::models::{Product, Review};

/// Shown when a review points at a product that is gone.
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReview {
    pub review: Review,
    pub product_name: Option<String>,
    pub product_brand: Option<String>,
}

impl UserReview {
    pub fn display_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(UNKNOWN_PRODUCT)
    }
}

pub struct UserReviews<B: Backend> {
    backend: B,
    tables: TableNames,
}

impl<B: Backend> UserReviews<B> {
    pub fn new(backend: B, config: &CoreConfig) -> Self {
        Self { backend, tables: config.tables.clone() }
    }

    /// Newest first, each paired with its product's name and brand.
    pub fn my_reviews(&self) -> CoreResult<Vec<UserReview>> {
        let user = session_user(&self.backend)?;
        let query = Query::from(&self.tables.reviews)
            .eq("usuario_id", user.id.as_str())
            .order("created_at", false);
        let reviews: Vec<Review> = decode_rows(&self.tables.reviews, self.backend.select(&query)?)?;
        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = reviews.iter().map(|r| r.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let query = Query::from(&self.tables.products).in_list("id", ids);
        let products: Vec<Product> =
            decode_rows(&self.tables.products, self.backend.select(&query)?)?;
        let products: HashMap<&str, &Product> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let product = products.get(review.product_id.as_str());
                UserReview {
                    product_name: product.map(|p| p.name.clone()),
                    product_brand: product.map(|p| p.brand.clone()),
                    review,
                }
            })
            .collect())
    }

    pub fn delete_my_reviews(&self) -> CoreResult<()> {
        let user = session_user(&self.backend)?;
        self.backend
            .delete(&self.tables.reviews, &[Filter::eq("usuario_id", user.id.as_str())])?;
        info!("Deleted all reviews of user {}", user.id);
        Ok(())
    }
}
