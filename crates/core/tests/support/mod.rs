//! Shared test helpers for `washslot-core` integration tests.
//!
//! In-memory mocks of every port plus fixture builders, so tests can focus
//! on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod audit;
pub mod calendar;
pub mod fixtures;
pub mod portal;
