//! Domain events
//!
//! Raised by the cart engine and drained by the host page, which forwards
//! them to the analytics collaborator (add-to-cart and order-sent counters).
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    LineAdded { merchant_id: String, product_id: String, quantity: u32 },
    LineRemoved { merchant_id: String, line_id: String },
    Cleared { merchant_id: Option<String> },
    OrderSent { merchant_id: String, merchant_slug: String, total: Money },
}
