// ibfund/src/export.rs
// Column-oriented file boundary.
//
// An accumulated table leaves the pipeline through three steps, in a fixed
// order: entirely-null columns are dropped, the survivors are coerced to
// numeric where every non-null cell parses, and the result is serialized as
// a column-oriented JSON document. Coercion runs after the drop so an
// all-null column never reaches the type decision.

use crate::base::FundError;
use crate::table::Table;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Cell data of one persisted column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum StoredValues {
  Text(Vec<Option<String>>),
  Real(Vec<Option<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredColumn {
  pub name: String,
  #[serde(flatten)]
  pub values: StoredValues,
}

/// On-disk form of one exported sub-report table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFile {
  pub created: DateTime<Utc>,
  pub rows: usize,
  pub columns: Vec<StoredColumn>,
}

// A column becomes numeric only if every non-null cell parses as f64.
fn coerce_column(values: Vec<Option<String>>) -> StoredValues {
  let mut reals = Vec::with_capacity(values.len());
  for v in &values {
    match v {
      None => reals.push(None),
      Some(s) => match s.trim().parse::<f64>() {
        Ok(f) => reals.push(Some(f)),
        Err(_) => return StoredValues::Text(values),
      },
    }
  }
  StoredValues::Real(reals)
}

/// Converts an accumulated table into its persisted form: drop all-null
/// columns, then coerce the remaining ones.
pub fn to_stored(mut table: Table) -> TableFile {
  let dropped = table.drop_null_columns();
  if !dropped.is_empty() {
    debug!("Dropped {} all-null column(s): {:?}", dropped.len(), dropped);
  }
  let rows = table.row_count();
  let columns = table.columns().iter()
    .map(|c| StoredColumn {
      name: c.name.clone(),
      values: coerce_column(c.values.clone()),
    })
    .collect();
  TableFile { created: Utc::now(), rows, columns }
}

pub fn write_table_file<P: AsRef<Path>>(path: P, table_file: &TableFile) -> Result<(), FundError> {
  let file = File::create(path.as_ref()).map_err(|e| {
    FundError::ExportError(format!("Failed to create {:?}: {}", path.as_ref(), e))
  })?;
  serde_json::to_writer(BufWriter::new(file), table_file).map_err(|e| {
    FundError::ExportError(format!("Failed to serialize {:?}: {}", path.as_ref(), e))
  })
}

pub fn read_table_file<P: AsRef<Path>>(path: P) -> Result<TableFile, FundError> {
  let file = File::open(path.as_ref()).map_err(|e| {
    FundError::ExportError(format!("Failed to open {:?}: {}", path.as_ref(), e))
  })?;
  serde_json::from_reader(BufReader::new(file)).map_err(|e| {
    FundError::ExportError(format!("Failed to deserialize {:?}: {}", path.as_ref(), e))
  })
}
