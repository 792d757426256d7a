//! Shared test utilities for the dimension catalog workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers
//! - Skip macros for optional test data
//! - The standard forecast dimension schema
//! - Combinatorial resource generators
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{standard_schema, resource_grid};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro to skip a test if the required file is not found.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_test_file;
///
/// #[test]
/// fn test_inventory_loading() {
///     let path = require_test_file!("inventory.yaml");
///     // Test code using path...
/// }
/// ```
///
/// If the file is not found, the test will print a skip message and return early.
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Set TEST_DATA_DIR to its directory.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Assert that a list of variables has exactly the given ids, in order.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_variable_ids;
///
/// assert_variable_ids!(selector.selected_variables(), ["GFS", "00Z", "wind", "10m"]);
/// ```
#[macro_export]
macro_rules! assert_variable_ids {
    ($variables:expr, [$($id:expr),* $(,)?]) => {{
        let variables = &$variables;
        let actual: Vec<&str> = variables.iter().map(|v| v.id()).collect();
        let expected: Vec<&str> = vec![$($id),*];
        assert_eq!(actual, expected, "variable ids differ");
    }};
}
