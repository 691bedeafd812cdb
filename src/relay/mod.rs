//! Relay implementations

mod batch;
mod builder;
mod service;

pub use batch::{DEFAULT_HISTORY_LIMIT, MAX_BATCH_ITEMS};
pub use builder::{Heimdallr, HeimdallrBuilder};
pub use service::{ChatRelay, RelayConfig};
