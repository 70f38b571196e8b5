//! Fleet: a three-stage bot pipeline.
//!
//! Tasks flow through an [`Evaluator`](coordinator::Evaluator), a
//! [`Planner`](coordinator::Planner) and an [`Executor`](coordinator::Executor).
//! Each coordinator fans its work out to a pool of sub-workers, joins their
//! outcomes, and learns from the results of finished executions.

pub mod actors;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod util;
pub mod worker;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineEvent};
