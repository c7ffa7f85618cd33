//! Request classification for mediator dispatch
//!
//! Every feature request is tagged as either a command or a query. The
//! markers carry no behavior; they make the write/read split explicit at the
//! type level so a request's role is visible at its definition.

/// Marker for requests that mutate state
pub trait Command {}

/// Marker for read-only requests
pub trait Query {}
