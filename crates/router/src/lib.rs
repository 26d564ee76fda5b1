//! `haulpay-router` — provider resolution, invocation, and fallback.
//!
//! The router is the only component that decides *which* processor handles
//! a request; adapters decide *how*. The connection tester shares the same
//! read path but never creates anything billable.

pub mod router;
pub mod tester;

pub use router::{DEFAULT_CALL_TIMEOUT, PaymentRouter, RoutedInvoice, RouterError};
pub use tester::{ConnectionTester, TestError};
