//! Terminal output formatting.
//!
//! Provides the human-readable run summary, status lines and JSON output.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{
    print_error, print_records, print_run_header, print_success, print_warning, status_line,
};
