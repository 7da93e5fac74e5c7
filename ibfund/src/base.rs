// ibfund/src/base.rs
// Base types and error definitions for the fundamentals pipeline

use thiserror::Error;

/// Errors that can occur while flattening and storing fundamental reports
#[derive(Error, Debug, Clone)]
pub enum FundError {
  #[error("Configuration error: {0}")]
  ConfigurationError(String),

  #[error("XML parse error: {0}")]
  ParseError(String),

  #[error("Selector syntax error: {0}")]
  SelectorError(String),

  #[error("Missing attribute '{attribute}' on element matched by '{path}'")]
  MissingAttribute { path: String, attribute: String },

  #[error("I/O error: {0}")]
  IoError(String),

  #[error("Database error: {0}")]
  DatabaseError(String),

  #[error("Export error: {0}")]
  ExportError(String),
}

impl From<std::io::Error> for FundError {
  fn from(e: std::io::Error) -> Self {
    FundError::IoError(e.to_string())
  }
}
