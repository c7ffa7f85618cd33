//! SDX Core - staging area for externally sourced records
//!
//! This crate implements the staging subsystem behind SDX: records arriving
//! from external sources are parked in a staging store, matched against
//! already persisted entities through configurable key/value fields, and then
//! pushed through an ordered chain of processing actions that decides whether
//! and how each record becomes a committed entity.
//!
//! # Architecture
//!
//! Feature slices under [`features`] expose the operations (create, update,
//! process, match, submit, poll) as mediator commands and queries with
//! function-based handlers. Cross-cutting machinery lives beside them:
//!
//! - [`models`] - domain types (staged records, match summaries, jobs)
//! - [`processing`] - the action registry and chain runner
//! - [`services`] - narrow contracts for external collaborators
//! - [`runner`] - the bounded worker pool executing batch submissions
//! - [`db`] - SQLite persistence for records, metadata, and jobs
//!
//! External concerns (REST surface, authentication, the search engine
//! implementation, entity persistence mechanics) stay outside this crate and
//! are consumed through the trait contracts in [`services`].

pub mod config;
pub mod context;
pub mod cqrs;
pub mod db;
pub mod features;
pub mod models;
pub mod processing;
pub mod runner;
pub mod services;

pub use config::StagingConfig;
pub use context::AppContext;
