//! Terminal output helpers for brotli-buffer tools
//!
//! Status lines plus size, ratio and duration formatting.

#![warn(missing_docs)]

pub mod output;
