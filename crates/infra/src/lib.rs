//! `haulpay-infra` — infrastructure implementations of the configuration
//! store: in-memory (dev/test) and Postgres (production).
//!
//! Orchestration stays in `haulpay-router`/`haulpay-config`; this crate
//! only knows how to persist and load tenant configuration documents with
//! per-tenant compare-and-swap semantics.

pub mod config_store;

#[cfg(test)]
mod integration_tests;

pub use config_store::{InMemoryConfigStore, PostgresConfigStore};
