//! Application layer: the transfer engine and PIN vault, which compose the
//! storage ports into the wallet's atomic operations.

pub mod engine;
pub mod pin;
