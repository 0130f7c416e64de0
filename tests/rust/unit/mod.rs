//! Unit tests for parsing edge cases and value semantics.
//!
//! Tests malformed queries, fuzz-style inputs and comparison laws to
//! ensure robust behavior without panics.

mod parser_robustness_tests;
mod value_property_tests;
