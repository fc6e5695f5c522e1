//! Common test utilities and helpers
//!
//! Shared test infrastructure: fixtures for the user registry, mock session
//! stores, and the in-process API test client.

pub mod fixtures;
pub mod mocks;
pub mod test_app;

pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
