//! Aggregates module
pub mod schedule;
pub mod catalog;
pub mod selection;
pub mod cart;

pub use schedule::{DaySchedule, ScheduleParseError, WeeklySchedule};
pub use catalog::{CatalogError, SelectionMode, VariantCatalog, VariantGroup, VariantOption};
pub use selection::{GroupSelection, SelectionState, ValidationError};
pub use cart::{AddOutcome, CartEngine, CartError, CartLine, CatalogProduct, ConflictDecision, ConflictPrompt, Merchant, MerchantKind};
