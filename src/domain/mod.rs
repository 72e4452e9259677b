//! Domain layer: aggregates, value objects, services and events
pub mod aggregates;
pub mod events;
pub mod services;
pub mod value_objects;
