//! Shared helpers for integration tests: fresh database per test, migrations applied.
pub mod prepare_env;
