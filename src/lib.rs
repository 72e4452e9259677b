//! Storefront core for messaging-based stores
//!
//! Decides whether a store is open, resolves product variant selections into
//! priced cart lines, keeps a single-merchant cart in client storage, composes
//! the order message handed to the merchant's messaging channel and
//! approximates how many visitors are viewing a store.
//!
//! ## Modules
//! - [`domain`]: schedule, catalog, selection and cart aggregates plus the
//!   availability and order-message services
//! - [`storage`]: client-side key/value capability the cart persists through
//! - [`presence`]: expiring heartbeat keys and the online counter
//! - [`config`] / [`api`]: the axum service wrapping the core

pub mod api;
pub mod config;
pub mod domain;
pub mod presence;
pub mod storage;

pub use domain::aggregates::{
    AddOutcome, CartEngine, CartError, CartLine, CatalogError, CatalogProduct, ConflictDecision, ConflictPrompt,
    DaySchedule, Merchant, MerchantKind, ScheduleParseError, SelectionState, ValidationError, VariantCatalog,
    VariantGroup, VariantOption, WeeklySchedule,
};
pub use domain::events::CartEvent;
pub use domain::services::{Availability, CheckoutProfile, ComposeError, CustomerDetails, OrderComposer, OrderMessage, StoreStatus};
pub use domain::value_objects::{CurrencyFormat, Money, TimeOfDay};
pub use presence::{PresenceApproximator, PresenceError, VisitorId};
pub use storage::{ClientStorage, StorageError};
