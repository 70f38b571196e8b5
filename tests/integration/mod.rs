//! Integration test suite for the fleet pipeline.
//!
//! These tests drive tasks through the public `Pipeline` API and check the
//! behavior the three coordinators show together.
//!
//! # Test Categories
//!
//! - `pipeline_e2e`: Full evaluate → plan → execute runs
//! - `learning`: Learning statistics fed by finished executions
//! - `concurrency`: Overlapping runs and concurrent fan-out
//! - `persistence`: JSON record store round trips
//! - `failure`: Deactivated coordinators and failing sub-workers
//!
//! Sub-worker latency is set to zero so the suite runs in milliseconds.

mod fixtures;

mod concurrency;
mod failure;
mod learning;
mod persistence;
mod pipeline_e2e;
