//! Shared feature utilities

pub mod validation;

#[cfg(test)]
pub mod test_helpers;
