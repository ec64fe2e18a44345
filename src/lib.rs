//! webintel — a fixed four-stage multi-agent pipeline for webpage
//! intelligence analysis.
//!
//! A run fetches a subject URL, analyzes the extracted text with a
//! function-calling oracle, enriches the analysis from an internal
//! lookup corpus, and produces a report. Stages thread a single
//! `WorkflowState` value and hand off results over a per-run message
//! bus; oracle-chosen actions execute sequentially through the action
//! resolver with `{{name}}` result bindings.
//!
//! The outbound-sharing tool is offered to the oracle only when the
//! analysis marks external sharing as required — least privilege at
//! the capability level.

pub mod agent;
pub mod bus;
pub mod config;
pub mod oracle;
pub mod pipeline;
pub mod resolver;
pub mod state;
pub mod tools;

pub use pipeline::{Pipeline, RunOutcome};
