//! Result export

pub mod export;

pub use export::{export_outcomes, write_comparison_csv, write_dispatch_csv, write_summary_json};
