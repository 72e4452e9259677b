//! Cart Aggregate
//!
//! Finalized lines for a single merchant. The engine owns the lines, persists
//! them through an injected [`ClientStorage`] on every mutation and never lets
//! two merchants share a cart: adding a foreign line yields a
//! [`ConflictPrompt`] that the caller resolves explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::catalog::VariantCatalog;
use crate::domain::aggregates::selection::{SelectionState, ValidationError};
use crate::domain::events::CartEvent;
use crate::domain::services::order_message::{ComposeError, CustomerDetails, OrderComposer, OrderMessage};
use crate::domain::value_objects::Money;
use crate::storage::{ClientStorage, CART_STORAGE_KEY};

/// Merchant category; service merchants take appointment requests instead of orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchantKind {
    #[default]
    Retail,
    Food,
    Service,
}

impl MerchantKind {
    pub fn takes_appointments(&self) -> bool { matches!(self, Self::Service) }
}

/// Read-only merchant record supplied by the store directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub kind: MerchantKind,
}

/// Read-only product record supplied by the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: String,
    pub title: String,
    pub base_price: Money,
    pub variants: VariantCatalog,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    id: String,
    product_id: String,
    title: String,
    unit_price: Money,
    quantity: u32,
    #[serde(default)]
    variant_labels: Vec<String>,
    #[serde(default)]
    note: Option<String>,
    merchant_id: String,
    merchant_name: String,
    #[serde(default)]
    merchant_slug: String,
    merchant_contact: String,
    #[serde(default)]
    merchant_kind: MerchantKind,
}

impl CartLine {
    pub fn new(
        merchant: &Merchant,
        product_id: impl Into<String>,
        title: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        variant_labels: Vec<String>,
        note: Option<String>,
    ) -> Result<Self, ValidationError> {
        if quantity == 0 { return Err(ValidationError::InvalidQuantity); }
        let product_id = product_id.into();
        Ok(Self {
            id: format!("{}-{}", product_id, Uuid::new_v4()),
            product_id,
            title: title.into(),
            unit_price,
            quantity,
            variant_labels,
            note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            merchant_id: merchant.id.clone(),
            merchant_name: merchant.name.clone(),
            merchant_slug: merchant.slug.clone(),
            merchant_contact: merchant.contact.clone(),
            merchant_kind: merchant.kind,
        })
    }

    /// Confirm a product selection. The variant price delta is baked into the
    /// unit price here and never re-resolved.
    pub fn from_selection(
        merchant: &Merchant,
        product: &CatalogProduct,
        selection: &SelectionState,
        quantity: u32,
        note: Option<String>,
    ) -> Result<Self, ValidationError> {
        selection.validate(&product.variants)?;
        let unit_price = product.base_price.add(selection.price_delta(&product.variants));
        Self::new(merchant, &product.id, &product.title, unit_price, quantity, selection.resolved_labels(&product.variants), note)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn product_id(&self) -> &str { &self.product_id }
    pub fn title(&self) -> &str { &self.title }
    pub fn unit_price(&self) -> Money { self.unit_price }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn variant_labels(&self) -> &[String] { &self.variant_labels }
    pub fn note(&self) -> Option<&str> { self.note.as_deref() }
    pub fn merchant_id(&self) -> &str { &self.merchant_id }
    pub fn merchant_name(&self) -> &str { &self.merchant_name }
    pub fn merchant_slug(&self) -> &str { &self.merchant_slug }
    pub fn merchant_contact(&self) -> &str { &self.merchant_contact }
    pub fn merchant_kind(&self) -> MerchantKind { self.merchant_kind }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// Check the invariants of a line list that arrived from outside the engine.
pub fn validate_lines(lines: &[CartLine]) -> Result<(), CartError> {
    if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
        return Err(CartError::InvalidQuantity(line.id.clone()));
    }
    if let Some(line) = lines.iter().find(|l| l.unit_price < Money::ZERO) {
        return Err(CartError::NegativePrice(line.id.clone()));
    }
    if let Some(first) = lines.first() {
        if lines.iter().any(|l| l.merchant_id != first.merchant_id) {
            return Err(CartError::MixedMerchants);
        }
    }
    Ok(())
}

/// Pending add that would mix merchants. Resolve it with [`CartEngine::resolve_conflict`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictPrompt {
    pub current_merchant: String,
    pub incoming_merchant: String,
    line: CartLine,
}

impl ConflictPrompt {
    pub fn line(&self) -> &CartLine { &self.line }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Conflict(ConflictPrompt),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Empty the cart, then add the pending line.
    Replace,
    Cancel,
}

pub struct CartEngine<S: ClientStorage> {
    lines: Vec<CartLine>,
    storage: S,
    events: Vec<CartEvent>,
    warning: Option<String>,
}

impl<S: ClientStorage> CartEngine<S> {
    /// Restore the persisted cart. Anything unreadable yields an empty cart.
    pub fn load(storage: S) -> Self {
        let mut warning = None;
        let lines = match storage.load(CART_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLine>>(&raw) {
                Ok(lines) => match validate_lines(&lines) {
                    Ok(()) => lines,
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding persisted cart");
                        vec![]
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "persisted cart is not readable, starting empty");
                    vec![]
                }
            },
            Ok(None) => vec![],
            Err(e) => {
                tracing::warn!(error = %e, "cart storage unavailable, starting empty");
                warning = Some(e.to_string());
                vec![]
            }
        };
        Self { lines, storage, events: vec![], warning }
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn line(&self, line_id: &str) -> Option<&CartLine> { self.lines.iter().find(|l| l.id == line_id) }
    pub fn merchant_id(&self) -> Option<&str> { self.lines.first().map(|l| l.merchant_id.as_str()) }
    pub fn merchant_name(&self) -> Option<&str> { self.lines.first().map(|l| l.merchant_name.as_str()) }

    /// Sum of `unit_price * quantity` over every line.
    pub fn total(&self) -> Money { self.lines.iter().map(CartLine::line_total).sum() }

    /// Units across all lines, for the cart badge.
    pub fn item_count(&self) -> u32 { self.lines.iter().map(|l| l.quantity).sum() }

    pub fn add_line(&mut self, line: CartLine) -> AddOutcome {
        if let Some(first) = self.lines.first() {
            if first.merchant_id != line.merchant_id {
                tracing::debug!(current = %first.merchant_id, incoming = %line.merchant_id, "cart merchant conflict");
                return AddOutcome::Conflict(ConflictPrompt {
                    current_merchant: first.merchant_name.clone(),
                    incoming_merchant: line.merchant_name.clone(),
                    line,
                });
            }
        }
        self.push(line);
        AddOutcome::Added
    }

    /// Second phase of a conflicting add. Returns whether the pending line was added.
    pub fn resolve_conflict(&mut self, prompt: ConflictPrompt, decision: ConflictDecision) -> bool {
        match decision {
            ConflictDecision::Cancel => false,
            ConflictDecision::Replace => {
                self.clear();
                self.push(prompt.line);
                true
            }
        }
    }

    fn push(&mut self, line: CartLine) {
        self.events.push(CartEvent::LineAdded {
            merchant_id: line.merchant_id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        });
        self.lines.push(line);
        self.persist();
    }

    pub fn remove(&mut self, line_id: &str) -> Result<(), CartError> {
        let index = self.lines.iter().position(|l| l.id == line_id).ok_or_else(|| CartError::LineNotFound(line_id.to_string()))?;
        let line = self.lines.remove(index);
        self.events.push(CartEvent::LineRemoved { merchant_id: line.merchant_id, line_id: line.id });
        self.persist();
        Ok(())
    }

    pub fn set_quantity(&mut self, line_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity(line_id.to_string())); }
        let line = self.lines.iter_mut().find(|l| l.id == line_id).ok_or_else(|| CartError::LineNotFound(line_id.to_string()))?;
        line.quantity = quantity;
        self.persist();
        Ok(())
    }

    pub fn clear(&mut self) {
        let merchant_id = self.merchant_id().map(str::to_string);
        self.lines.clear();
        self.events.push(CartEvent::Cleared { merchant_id });
        self.persist();
    }

    /// Compose the order message for the current cart and empty it. Opening the
    /// returned URI is the caller's job.
    pub fn checkout(&mut self, customer: &CustomerDetails, composer: &OrderComposer) -> Result<OrderMessage, ComposeError> {
        let message = composer.compose(&self.lines, customer)?;
        let first = &self.lines[0];
        let sent = CartEvent::OrderSent {
            merchant_id: first.merchant_id.clone(),
            merchant_slug: first.merchant_slug.clone(),
            total: self.total(),
        };
        self.lines.clear();
        self.events.push(sent);
        self.persist();
        Ok(message)
    }

    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }

    /// Last storage failure, if any. The in-memory cart stays authoritative.
    pub fn take_warning(&mut self) -> Option<String> { self.warning.take() }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.lines)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.storage.save(CART_STORAGE_KEY, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist cart");
            self.warning = Some(e);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart line {0:?} not found")]
    LineNotFound(String),
    #[error("cart line {0:?} must have a quantity of at least 1")]
    InvalidQuantity(String),
    #[error("cart line {0:?} has a negative unit price")]
    NegativePrice(String),
    #[error("cart lines belong to more than one merchant")]
    MixedMerchants,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::catalog::{VariantGroup, VariantOption};
    use crate::storage::{MemoryStorage, StorageError};
    use std::sync::Arc;

    fn merchant(id: &str, name: &str) -> Merchant {
        Merchant { id: id.into(), slug: id.into(), name: name.into(), contact: "+55 11 99999-0000".into(), kind: MerchantKind::Food }
    }

    fn burger(m: &Merchant, qty: u32) -> CartLine {
        CartLine::new(m, "p-burger", "Burger", Money::from_minor(2500), qty, vec![], None).unwrap()
    }

    struct BrokenStorage;
    impl ClientStorage for BrokenStorage {
        fn load(&self, _: &str) -> Result<Option<String>, StorageError> { Err(StorageError::Unavailable("private mode".into())) }
        fn save(&self, _: &str, _: &str) -> Result<(), StorageError> { Err(StorageError::Unavailable("quota".into())) }
    }

    #[test]
    fn test_cart_total() {
        let mut cart = CartEngine::load(MemoryStorage::new());
        let joes = merchant("m1", "Joe's");
        assert_eq!(cart.add_line(burger(&joes, 2)), AddOutcome::Added);
        assert_eq!(cart.total(), Money::from_minor(5000));
        cart.add_line(CartLine::new(&joes, "p-soda", "Soda", Money::from_minor(600), 1, vec![], None).unwrap());
        assert_eq!(cart.total(), Money::from_minor(5600));
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_foreign_merchant_prompts_without_mutation() {
        let mut cart = CartEngine::load(MemoryStorage::new());
        let joes = merchant("m1", "Joe's");
        let anas = merchant("m2", "Ana's");
        cart.add_line(burger(&joes, 1));
        let before = cart.lines().to_vec();

        let prompt = match cart.add_line(burger(&anas, 3)) {
            AddOutcome::Conflict(prompt) => prompt,
            AddOutcome::Added => panic!("expected conflict"),
        };
        assert_eq!(prompt.current_merchant, "Joe's");
        assert_eq!(prompt.incoming_merchant, "Ana's");
        assert_eq!(cart.lines(), before.as_slice());

        assert!(!cart.resolve_conflict(prompt.clone(), ConflictDecision::Cancel));
        assert_eq!(cart.lines(), before.as_slice());

        assert!(cart.resolve_conflict(prompt.clone(), ConflictDecision::Replace));
        assert_eq!(cart.lines(), std::slice::from_ref(prompt.line()));
        assert_eq!(cart.merchant_id(), Some("m2"));
    }

    #[test]
    fn test_quantity_and_removal() {
        let mut cart = CartEngine::load(MemoryStorage::new());
        let joes = merchant("m1", "Joe's");
        cart.add_line(burger(&joes, 1));
        let id = cart.lines()[0].id().to_string();

        cart.set_quantity(&id, 4).unwrap();
        assert_eq!(cart.total(), Money::from_minor(10000));
        assert_eq!(cart.set_quantity(&id, 0), Err(CartError::InvalidQuantity(id.clone())));
        assert_eq!(cart.set_quantity("nope", 2), Err(CartError::LineNotFound("nope".into())));

        cart.remove(&id).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove(&id), Err(CartError::LineNotFound(id)));
    }

    #[test]
    fn test_price_fixed_at_add_time() {
        let joes = merchant("m1", "Joe's");
        let mut product = CatalogProduct {
            id: "p-burger".into(),
            title: "Burger".into(),
            base_price: Money::from_minor(2500),
            variants: VariantCatalog::new(vec![VariantGroup::single("Size", true, vec![
                VariantOption { label: "Large".into(), price_delta: Money::from_minor(300) },
            ]).unwrap()]).unwrap(),
        };
        let selection = SelectionState::new().toggle(&product.variants, "Size", "Large", true).unwrap();
        let line = CartLine::from_selection(&joes, &product, &selection, 2, Some("  no onions ".into())).unwrap();
        assert_eq!(line.unit_price(), Money::from_minor(2800));
        assert_eq!(line.variant_labels(), ["Size: Large".to_string()]);
        assert_eq!(line.note(), Some("no onions"));

        let mut cart = CartEngine::load(MemoryStorage::new());
        cart.add_line(line);
        product.base_price = Money::from_minor(9900);
        assert_eq!(cart.total(), Money::from_minor(5600));
    }

    #[test]
    fn test_incomplete_selection_blocks_line() {
        let joes = merchant("m1", "Joe's");
        let product = CatalogProduct {
            id: "p".into(),
            title: "Pizza".into(),
            base_price: Money::from_minor(4000),
            variants: VariantCatalog::new(vec![VariantGroup::single("Crust", true, vec![
                VariantOption { label: "Thin".into(), price_delta: Money::ZERO },
            ]).unwrap()]).unwrap(),
        };
        let result = CartLine::from_selection(&joes, &product, &SelectionState::new(), 1, None);
        assert!(matches!(result, Err(ValidationError::Incomplete { .. })));
        let zero = CartLine::new(&joes, "p", "Pizza", Money::from_minor(4000), 0, vec![], None);
        assert_eq!(zero, Err(ValidationError::InvalidQuantity));
    }

    #[test]
    fn test_persists_and_restores() {
        let storage = Arc::new(MemoryStorage::new());
        let joes = merchant("m1", "Joe's");
        {
            let mut cart = CartEngine::load(storage.clone());
            cart.add_line(burger(&joes, 2));
        }
        let restored = CartEngine::load(storage.clone());
        assert_eq!(restored.lines().len(), 1);
        assert_eq!(restored.total(), Money::from_minor(5000));
    }

    #[test]
    fn test_corrupt_storage_falls_back_to_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(CART_STORAGE_KEY, "{not json").unwrap();
        assert!(CartEngine::load(storage.clone()).is_empty());

        let mixed = vec![burger(&merchant("m1", "A"), 1), burger(&merchant("m2", "B"), 1)];
        storage.save(CART_STORAGE_KEY, &serde_json::to_string(&mixed).unwrap()).unwrap();
        assert!(CartEngine::load(storage).is_empty());
    }

    #[test]
    fn test_validate_lines_rejects_negative_price() {
        let joes = merchant("m1", "Joe's");
        let refund = CartLine::new(&joes, "p-x", "Coupon", Money::from_minor(-500), 1, vec![], None).unwrap();
        let id = refund.id().to_string();
        assert_eq!(validate_lines(&[burger(&joes, 1), refund]), Err(CartError::NegativePrice(id)));
        assert_eq!(validate_lines(&[burger(&joes, 1)]), Ok(()));
    }

    #[test]
    fn test_storage_failures_are_swallowed() {
        let mut cart = CartEngine::load(BrokenStorage);
        assert!(cart.take_warning().is_some());
        assert_eq!(cart.add_line(burger(&merchant("m1", "Joe's"), 1)), AddOutcome::Added);
        assert_eq!(cart.lines().len(), 1);
        assert!(cart.take_warning().unwrap().contains("quota"));
    }

    #[test]
    fn test_events_are_collected() {
        let mut cart = CartEngine::load(MemoryStorage::new());
        let joes = merchant("m1", "Joe's");
        cart.add_line(burger(&joes, 2));
        cart.clear();
        assert_eq!(cart.take_events(), vec![
            CartEvent::LineAdded { merchant_id: "m1".into(), product_id: "p-burger".into(), quantity: 2 },
            CartEvent::Cleared { merchant_id: Some("m1".into()) },
        ]);
        assert!(cart.take_events().is_empty());
    }

    #[test]
    fn test_checkout_clears_cart() {
        let mut cart = CartEngine::load(MemoryStorage::new());
        cart.add_line(burger(&merchant("m1", "Joe's"), 2));
        let customer = CustomerDetails::new(Some("Maria"), "Rua A, 10");
        let message = cart.checkout(&customer, &OrderComposer::default()).unwrap();
        assert!(message.text.contains("2x Burger"));
        assert!(cart.is_empty());
        assert!(matches!(cart.take_events().last(), Some(CartEvent::OrderSent { total, .. }) if *total == Money::from_minor(5000)));

        assert!(matches!(cart.checkout(&customer, &OrderComposer::default()), Err(ComposeError::EmptyCart)));
    }
}
