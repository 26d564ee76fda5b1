//! Configuration store implementations.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryConfigStore;
pub use postgres::PostgresConfigStore;
