//! Domain model: aggregates, value objects, the stock ledger and events.
pub mod aggregates;
pub mod events;
pub mod stock;
pub mod value_objects;
