//! Tests for the executor
//!
//! Organized by feature area

mod control_tests;
mod helpers;
mod property_tests;
