//! Adapters layer: concrete implementations of the ports.

pub mod loopback;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use loopback::LoopbackTransport;
pub use memory::InMemoryRegistry;
pub use sqlite::{SqliteScreeningStore, StoreError};
