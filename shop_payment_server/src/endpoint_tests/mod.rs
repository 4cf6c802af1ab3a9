//! Endpoint tests run against mocked backends, so they exercise routing, extraction, signature handling and
//! status-code mapping without a real database.
mod helpers;
mod mocks;
mod orders;
mod webhook;
