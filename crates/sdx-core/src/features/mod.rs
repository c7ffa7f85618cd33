//! Feature modules implementing the staging API
//!
//! This module contains all feature slices following the CQRS (Command Query
//! Responsibility Segregation) pattern. Each feature is organized as a
//! vertical slice with its own commands and queries.
//!
//! # Features
//!
//! - **staging**: Staged record lifecycle (create, update, delete, process,
//!   read, list)
//! - **matching**: Matchable-tuple probes against the authoritative index
//! - **jobs**: Batch submission and job status tracking
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations (create, update, process)
//! - `queries/` - Read operations (get, list, match)
//!
//! Commands and queries implement the mediator pattern using the `mediator`
//! crate, enabling clean separation of concerns and easy testing.

pub mod jobs;
pub mod matching;
pub mod shared;
pub mod staging;
