//! Observability: structured logging via `tracing-subscriber`.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the binary (or the embedding application).

mod tracing_init;

pub use tracing_init::*;
