//! Harness adapter contracts for `unitscope`.
//!
//! This crate provides a framework-agnostic interface for executing test
//! units, plus [`LifecycleHarness`], which runs each unit between the
//! `unitscope` begin and end hooks.

mod adapter;
mod lifecycle_harness;
mod runner;
#[cfg(test)]
mod test_utils;

pub use adapter::HarnessAdapter;
pub use lifecycle_harness::LifecycleHarness;
pub use runner::{RunningUnit, UnitMetadata, UnitRunRequest, UnitRunner};
