//! Domain layer: value objects, entities and the storage ports.

pub mod account;
pub mod ports;
pub mod transaction;
