// ibfund/src/lib.rs
// Main entry point for the fundamentals flattening library

//! # ibfund
//!
//! Flattens Interactive Brokers fundamental-data XML reports
//! (ReportsFinStatements, ReportSnapshot, RESC) into tables and persists
//! them:
//!
//! - A generic hierarchical-XML-to-table flattening engine driven by
//!   declarative mapping catalogs
//! - Per-report-family catalogs transcribed from the Reuters schemas
//! - A batch pipeline over `fundamentals/{symbol}/{report}.xml` files
//! - Column-oriented JSON export and a SQLite loader

mod base;
mod xml_tree;
mod table;
mod flatten;
mod report_fin_statements;
mod report_snapshot;
mod report_resc;
pub mod report;
pub mod export;
pub mod pipeline;
pub mod store;

pub use base::FundError;
pub use flatten::{flatten, FieldSource, FieldSpec, Mapping};
pub use report::ReportType;
pub use table::{Column, Table};
pub use xml_tree::{parse_document, Element, Selector};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
