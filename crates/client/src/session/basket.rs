//! The basket: one view over the anonymous local basket and the server cart.
//!
//! Before sign-in, additions go to [`LocalBasket`], a list of
//! `{variant_id, quantity}` lines persisted under
//! [`keys::ANONYMOUS_BASKET`]. At sign-in the local lines are merged into
//! the server cart; lines the backend refuses stay local so nothing is
//! silently lost.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use medusa_storefront_core::VariantId;

use super::cart::CartSession;
use crate::medusa::Cart;
use crate::storage::{KeyValueStore, StorageError, keys};

/// One line of the anonymous basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketLine {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// What the customer is currently building.
#[derive(Debug, Clone, PartialEq)]
pub enum Basket {
    /// Local lines, not yet known to the backend.
    Anonymous(Vec<BasketLine>),
    /// The server cart of a signed-in customer (none created yet), plus
    /// local lines the backend has not accepted yet.
    Synced {
        cart: Option<Box<Cart>>,
        pending: Vec<BasketLine>,
    },
}

fn line_total<'a>(lines: impl IntoIterator<Item = &'a BasketLine>) -> u32 {
    lines
        .into_iter()
        .fold(0, |total, line| total.saturating_add(line.quantity))
}

impl Basket {
    /// Sum of line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        match self {
            Self::Anonymous(lines) => line_total(lines),
            Self::Synced { cart, pending } => cart
                .as_ref()
                .map_or(0, |cart| cart.item_count())
                .saturating_add(line_total(pending)),
        }
    }

    /// Whether nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Local lines the server cart does not hold.
    #[must_use]
    pub fn pending(&self) -> &[BasketLine] {
        match self {
            Self::Anonymous(lines) | Self::Synced { pending: lines, .. } => lines,
        }
    }

    /// Quantity of `variant_id` across all lines.
    #[must_use]
    pub fn quantity_of(&self, variant_id: &VariantId) -> u32 {
        let local = line_total(
            self.pending()
                .iter()
                .filter(|line| &line.variant_id == variant_id),
        );
        let server = match self {
            Self::Anonymous(_) => 0,
            Self::Synced { cart, .. } => cart.as_ref().map_or(0, |cart| {
                cart.items
                    .iter()
                    .filter(|item| item.variant_id.as_ref() == Some(variant_id))
                    .fold(0, |total: u32, item| total.saturating_add(item.quantity))
            }),
        };
        server.saturating_add(local)
    }
}

/// Result of merging the local basket into the server cart.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    /// Lines now in the server cart.
    pub merged: Vec<BasketLine>,
    /// Lines the backend refused, with its message; still in the local basket.
    pub failed: Vec<(BasketLine, String)>,
    /// Server cart after the last successful merge.
    pub cart: Option<Cart>,
    /// Whether the remaining lines were saved; when not, they are only kept
    /// in memory for this process.
    pub persisted: bool,
}

impl Default for MergeReport {
    fn default() -> Self {
        Self {
            merged: Vec::new(),
            failed: Vec::new(),
            cart: None,
            persisted: true,
        }
    }
}

impl MergeReport {
    /// Whether every local line reached the server cart.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.persisted
    }
}

// =============================================================================
// LocalBasket
// =============================================================================

/// Anonymous basket persisted in the identity store.
pub struct LocalBasket {
    store: Arc<dyn KeyValueStore>,
    lines: Mutex<Vec<BasketLine>>,
}

impl std::fmt::Debug for LocalBasket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBasket")
            .field("lines", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl LocalBasket {
    /// Open the basket saved in `store`. Unreadable saved state is discarded.
    #[must_use]
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let lines = store
            .get(keys::ANONYMOUS_BASKET)
            .and_then(|raw| match serde_json::from_str::<Vec<BasketLine>>(&raw) {
                Ok(lines) => Some(lines),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable anonymous basket");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            store,
            lines: Mutex::new(lines),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BasketLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, lines: &[BasketLine]) -> Result<(), StorageError> {
        if lines.is_empty() {
            self.store.remove(keys::ANONYMOUS_BASKET)
        } else {
            self.store
                .set(keys::ANONYMOUS_BASKET, &serde_json::to_string(lines)?)
        }
    }

    /// Current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<BasketLine> {
        self.lock().clone()
    }

    /// Whether the basket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Add `quantity` of a variant, folding into an existing line.
    ///
    /// # Errors
    ///
    /// Returns an error if the basket could not be persisted.
    pub fn add(&self, variant_id: &VariantId, quantity: u32) -> Result<Vec<BasketLine>, StorageError> {
        let mut lines = self.lock();
        if quantity > 0 {
            match lines.iter_mut().find(|line| &line.variant_id == variant_id) {
                Some(line) => line.quantity = line.quantity.saturating_add(quantity),
                None => lines.push(BasketLine {
                    variant_id: variant_id.clone(),
                    quantity,
                }),
            }
            self.persist(&lines)?;
        }
        Ok(lines.clone())
    }

    /// Set a variant's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the basket could not be persisted.
    pub fn set_quantity(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Vec<BasketLine>, StorageError> {
        let mut lines = self.lock();
        if quantity == 0 {
            lines.retain(|line| &line.variant_id != variant_id);
        } else if let Some(line) = lines.iter_mut().find(|line| &line.variant_id == variant_id) {
            line.quantity = quantity;
        } else {
            lines.push(BasketLine {
                variant_id: variant_id.clone(),
                quantity,
            });
        }
        self.persist(&lines)?;
        Ok(lines.clone())
    }

    /// Remove a variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the basket could not be persisted.
    pub fn remove(&self, variant_id: &VariantId) -> Result<Vec<BasketLine>, StorageError> {
        self.set_quantity(variant_id, 0)
    }

    /// Empty the basket.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored basket could not be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut lines = self.lock();
        lines.clear();
        self.persist(&lines)
    }

    /// Move every line into the server cart.
    ///
    /// Lines are added one at a time through `cart`, so the cart snapshot
    /// ends on the backend's last answer. Refused lines stay in the basket
    /// and are listed in [`MergeReport::failed`]. If the remaining lines
    /// cannot be saved the report says so; the in-memory basket is still
    /// up to date.
    #[instrument(skip_all)]
    pub async fn merge_into(&self, cart: &CartSession) -> MergeReport {
        let pending = self.lines();
        let mut report = MergeReport::default();

        for line in pending {
            match cart.add_to_cart(&line.variant_id, line.quantity).await {
                Ok(snapshot) => {
                    report.cart = Some(snapshot);
                    report.merged.push(line);
                }
                Err(e) => {
                    tracing::warn!(variant_id = %line.variant_id, error = %e, "Basket line not merged");
                    report.failed.push((line, e.to_string()));
                }
            }
        }

        // Lines added concurrently during the merge are kept as well.
        let mut lines = self.lock();
        lines.retain(|line| !report.merged.contains(line));
        if let Err(e) = self.persist(&lines) {
            tracing::warn!(error = %e, "Failed to save basket after merge");
            report.persisted = false;
        }

        tracing::info!(
            merged = report.merged.len(),
            failed = report.failed.len(),
            "Merged anonymous basket"
        );
        report
    }
}
