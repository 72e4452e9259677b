//! Domain services
pub mod availability;
pub mod order_message;

pub use availability::{evaluate, status, status_from_json, status_of, is_open_now, merchant_is_open, merchant_status, Availability, StoreStatus};
pub use order_message::{CheckoutProfile, ComposeError, CustomerDetails, DeliveryAddress, OrderComposer, OrderMessage, OrderTranscript};
