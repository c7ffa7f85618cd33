//! SDX Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the SDX project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all SDX workspace members:
//!
//! - **Error Handling**: The shared error taxonomy and result alias
//! - **Checksums**: Payload integrity utilities
//! - **Types**: Wire-level domain types shared between the core library and hosts
//!
//! # Example
//!
//! ```
//! use sdx_common::checksum::payload_checksum;
//!
//! let checksum = payload_checksum(br#"{"name":"aspirin"}"#);
//! assert_eq!(checksum.len(), 64);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SdxError};
