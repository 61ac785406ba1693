//! Client-held cart ledger.
//!
//! The ledger is a flat list of entries, one entry per unit; quantity N of
//! a variant is N duplicate entries. All mutations are pure reducer
//! functions over an immutable list, and persistence to durable storage is
//! an explicit side effect applied after each reduction (see
//! [`CartLedger`]). This state is advisory only: the stock verifier is
//! authoritative at checkout time.

pub mod store;

pub use store::{CartStore, CartStoreError, InMemoryCartStore};

use crate::properties::{canonical_key, PropertySet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One unit of a chosen variant held in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CartEntry {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    #[serde(default)]
    pub properties: PropertySet,
    pub unit_price: Decimal,
    /// Variant stock observed at add-time; a soft bound only.
    pub stock_snapshot: i32,
}

/// Identifies the entries a reducer operates on: same variant with an
/// identically-serializing property-set.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSelector {
    pub variant_id: Uuid,
    pub properties: PropertySet,
}

impl CartSelector {
    pub fn for_entry(entry: &CartEntry) -> Self {
        Self {
            variant_id: entry.variant_id,
            properties: entry.properties.clone(),
        }
    }

    fn matches(&self, entry: &CartEntry) -> bool {
        entry.variant_id == self.variant_id
            && canonical_key(&entry.properties) == canonical_key(&self.properties)
    }
}

/// Errors surfaced by the add/increase reducers. The messages are the
/// storefront's user-facing strings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("نفذت الكمية من المخزون")]
    OutOfStock,
    #[error("الكمية المتوفرة في المخزون {available} قطع فقط")]
    InsufficientStock { available: i32 },
    #[error("المنتج غير موجود في السلة")]
    NotInCart,
}

/// Result of a decrease reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum Decrease {
    /// The most recently added matching entry was removed.
    Updated(Vec<CartEntry>),
    /// Exactly one matching unit remains; removal needs confirmation via
    /// [`remove`].
    ConfirmationRequired,
    NotInCart,
}

/// A grouped cart line as sent to stock verification and checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GroupedLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub properties: PropertySet,
}

/// Adds `quantity` units of `entry`, checking the requested total against
/// the entry's stock snapshot.
pub fn add(
    entries: &[CartEntry],
    entry: CartEntry,
    quantity: u32,
) -> Result<Vec<CartEntry>, CartError> {
    let selector = CartSelector::for_entry(&entry);
    let in_cart = entries.iter().filter(|e| selector.matches(e)).count() as i32;
    let requested = in_cart + quantity as i32;

    if requested > entry.stock_snapshot {
        let remaining = entry.stock_snapshot - in_cart;
        if remaining <= 0 {
            return Err(CartError::OutOfStock);
        }
        return Err(CartError::InsufficientStock {
            available: remaining,
        });
    }

    let mut next = entries.to_vec();
    next.extend(std::iter::repeat(entry).take(quantity as usize));
    Ok(next)
}

/// Adds one more unit of an entry already in the cart.
pub fn increase(entries: &[CartEntry], selector: &CartSelector) -> Result<Vec<CartEntry>, CartError> {
    let existing = entries
        .iter()
        .find(|e| selector.matches(e))
        .cloned()
        .ok_or(CartError::NotInCart)?;
    add(entries, existing, 1)
}

/// Removes the most recently added matching entry. When only one matching
/// unit remains, asks for confirmation instead of removing it.
pub fn decrease(entries: &[CartEntry], selector: &CartSelector) -> Decrease {
    let matching = entries.iter().filter(|e| selector.matches(e)).count();
    match matching {
        0 => Decrease::NotInCart,
        1 => Decrease::ConfirmationRequired,
        _ => {
            let last = entries
                .iter()
                .rposition(|e| selector.matches(e))
                .expect("matching count checked above");
            let mut next = entries.to_vec();
            next.remove(last);
            Decrease::Updated(next)
        }
    }
}

/// Confirmed removal of the last matching unit (or units, if several
/// remain).
pub fn remove(entries: &[CartEntry], selector: &CartSelector) -> Vec<CartEntry> {
    entries
        .iter()
        .filter(|e| !selector.matches(e))
        .cloned()
        .collect()
}

/// Empties the ledger (used after successful payment).
pub fn clear() -> Vec<CartEntry> {
    Vec::new()
}

/// Collapses duplicate entries into grouped lines, independent of entry
/// insertion order.
pub fn group(entries: &[CartEntry]) -> Vec<GroupedLine> {
    let mut groups: BTreeMap<(Uuid, String), GroupedLine> = BTreeMap::new();
    for entry in entries {
        groups
            .entry((entry.product_id, canonical_key(&entry.properties)))
            .and_modify(|line| line.quantity += 1)
            .or_insert_with(|| GroupedLine {
                product_id: entry.product_id,
                quantity: 1,
                unit_price: entry.unit_price,
                properties: entry.properties.clone(),
            });
    }
    groups.into_values().collect()
}

/// Cart state plus its durable store. Every mutation applies a reducer and
/// then persists the result; persistence is a visible side effect, not
/// ambient context.
#[derive(Debug)]
pub struct CartLedger<S: CartStore> {
    entries: Vec<CartEntry>,
    store: S,
}

impl<S: CartStore> CartLedger<S> {
    /// Restores the ledger from storage; empty storage yields an empty
    /// ledger.
    pub fn load(store: S) -> Result<Self, CartStoreError> {
        let entries = store.load()?.unwrap_or_default();
        Ok(Self { entries, store })
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn grouped(&self) -> Vec<GroupedLine> {
        group(&self.entries)
    }

    pub fn add(&mut self, entry: CartEntry, quantity: u32) -> Result<(), CartError> {
        let next = add(&self.entries, entry, quantity)?;
        self.commit(next);
        Ok(())
    }

    pub fn increase(&mut self, selector: &CartSelector) -> Result<(), CartError> {
        let next = increase(&self.entries, selector)?;
        self.commit(next);
        Ok(())
    }

    pub fn decrease(&mut self, selector: &CartSelector) -> Decrease {
        match decrease(&self.entries, selector) {
            Decrease::Updated(next) => {
                self.commit(next.clone());
                Decrease::Updated(next)
            }
            other => other,
        }
    }

    pub fn remove(&mut self, selector: &CartSelector) {
        let next = remove(&self.entries, selector);
        self.commit(next);
    }

    pub fn clear(&mut self) {
        self.commit(clear());
    }

    fn commit(&mut self, next: Vec<CartEntry>) {
        self.entries = next;
        if self.entries.is_empty() {
            if let Err(e) = self.store.clear() {
                tracing::warn!("cart store clear failed: {}", e);
            }
        } else if let Err(e) = self.store.save(&self.entries) {
            tracing::warn!("cart store save failed: {}", e);
        }
    }
}
