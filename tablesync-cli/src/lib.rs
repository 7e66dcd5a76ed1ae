//! Library half of the `tablesync` binary: config loading and dataset files.

pub mod config;
pub mod files;
