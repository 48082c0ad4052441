//! Test-first feature generation against a cloned repository.
//!
//! The library exposes the two pipelines (test generation, feature
//! implementation) and the components they are built from, so callers can
//! drive them with their own model client or test runner.

pub mod config;
pub mod contexts;
pub mod data;
pub mod providers;
