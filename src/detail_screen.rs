//! Per-screen state for the product detail view.
//!
//! Reads are issued under a [`LoadTicket`]. A result is applied only if its
//! ticket is still the latest one and the screen is still mounted, so late
//! completions never touch a view that moved on or went away.

use log::debug;

use crate::composer::ProductDetailViewModel;
use crate::error::CoreError;
use crate::models::RowId;

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Loaded(ProductDetailViewModel),
    NotFound,
    /// Transient alert. `previous` is restored on dismiss.
    ErrorDisplayed {
        message: String,
        previous: Option<Box<ProductDetailViewModel>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    product_id: RowId,
}

impl LoadTicket {
    pub fn product_id(&self) -> &str {
        &self.product_id
    }
}

#[derive(Debug)]
pub struct DetailScreen {
    product_id: RowId,
    state: DetailState,
    generation: u64,
    mounted: bool,
}

impl DetailScreen {
    pub fn new(product_id: impl Into<RowId>) -> Self {
        Self {
            product_id: product_id.into(),
            state: DetailState::Loading,
            generation: 0,
            mounted: true,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn view_model(&self) -> Option<&ProductDetailViewModel> {
        match &self.state {
            DetailState::Loaded(vm) => Some(vm),
            _ => None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Starts a fetch for the current product.
    ///
    /// A loaded screen keeps showing its content while the refresh is in
    /// flight; anything else shows the loading indicator.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        if !matches!(self.state, DetailState::Loaded(_)) {
            self.state = DetailState::Loading;
        }
        LoadTicket {
            generation: self.generation,
            product_id: self.product_id.clone(),
        }
    }

    /// Switches to another product. Outstanding tickets become stale.
    pub fn set_product_id(&mut self, product_id: impl Into<RowId>) -> LoadTicket {
        self.product_id = product_id.into();
        self.state = DetailState::Loading;
        self.begin_load()
    }

    /// Applies a finished read. Returns `false` when the result was discarded.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<ProductDetailViewModel, CoreError>,
    ) -> bool {
        if !self.mounted {
            debug!("Discarding detail result for {}: screen unmounted", ticket.product_id);
            return false;
        }
        if ticket.generation != self.generation {
            debug!(
                "Discarding stale detail result for {} (generation {} < {})",
                ticket.product_id, ticket.generation, self.generation
            );
            return false;
        }

        let next = match result {
            Ok(vm) => DetailState::Loaded(vm),
            Err(CoreError::NotFound(_)) => DetailState::NotFound,
            Err(err) => DetailState::ErrorDisplayed {
                message: err.user_message(),
                previous: self.take_loaded(),
            },
        };
        self.state = next;
        true
    }

    /// Surfaces a failed write. Only a loaded screen shows the alert.
    pub fn write_failed(&mut self, error: &CoreError) -> bool {
        if !self.mounted {
            return false;
        }
        match self.take_loaded() {
            Some(previous) => {
                self.state = DetailState::ErrorDisplayed {
                    message: error.user_message(),
                    previous: Some(previous),
                };
                true
            }
            None => false,
        }
    }

    /// Closes the alert. A failed first load has nothing to go back to and
    /// stays on the error until the next `begin_load`.
    pub fn dismiss_error(&mut self) -> bool {
        let DetailState::ErrorDisplayed { previous, .. } = &mut self.state else {
            return false;
        };
        match previous.take() {
            Some(vm) => {
                self.state = DetailState::Loaded(*vm);
                true
            }
            None => false,
        }
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    fn take_loaded(&mut self) -> Option<Box<ProductDetailViewModel>> {
        match std::mem::replace(&mut self.state, DetailState::Loading) {
            DetailState::Loaded(vm) => Some(Box::new(vm)),
            // A second alert keeps the snapshot from before the first.
            DetailState::ErrorDisplayed { previous: Some(vm), .. } => Some(vm),
            other => {
                self.state = other;
                None
            }
        }
    }
}
