//! Batch-file interface used by the binary and end-to-end tests.

pub mod csv;
