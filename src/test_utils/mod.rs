//! Shared fixtures for the unit tests
mod common;

pub use common::*;
