//! Testing utilities for the Consilium workspace
//!
//! Shared test doubles and fixtures.

#![allow(missing_docs)]

pub mod fixtures;
pub mod mock;

pub use mock::{Gate, MockService};
