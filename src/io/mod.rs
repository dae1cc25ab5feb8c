//! Input/Output operations for SCF runs
//!
//! This module handles logging setup and the result files.

mod output;

pub use output::{save_bundle, setup_output, write_eigenvalues, write_field_table};
