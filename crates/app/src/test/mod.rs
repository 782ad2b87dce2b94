//! Shared test infrastructure for `PostgreSQL`-backed tests.
//!
//! Tests using these helpers start a container and are marked
//! `#[ignore = "requires a container runtime"]`; run them with
//! `cargo test -- --ignored`.

pub(crate) mod helpers;

pub(crate) use context::TestContext;
pub(crate) use db::TestDb;
