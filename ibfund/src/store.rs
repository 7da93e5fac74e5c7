// ibfund/src/store.rs
// Loads exported columnar files into a SQLite database, one relational
// table per file, replacing any previous table of the same name.

use crate::base::FundError;
use crate::export::{read_table_file, StoredValues, TableFile};

use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

// Column names come straight from the report schemas and may contain spaces
// or lead with digits ("Issue Name", "52WKHIGH"), so identifiers are always
// double-quoted.
fn quote_ident(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replaces the named table with the contents of `table_file`. Everything
/// runs in one transaction; a failure leaves the previous table intact.
pub fn replace_table(
  conn: &mut Connection,
  table_name: &str,
  table_file: &TableFile,
) -> Result<(), FundError> {
  if table_file.columns.is_empty() {
    warn!("Table '{}' has no columns; nothing to load", table_name);
    return Ok(());
  }

  let tx = conn.transaction().map_err(|e| {
    FundError::DatabaseError(format!("Failed to start transaction: {}", e))
  })?;

  let quoted_table = quote_ident(table_name);
  tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quoted_table)).map_err(|e| {
    FundError::DatabaseError(format!("Failed to drop table '{}': {}", table_name, e))
  })?;

  let column_defs: Vec<String> = table_file.columns.iter()
    .map(|c| {
      let sql_type = match c.values {
        StoredValues::Text(_) => "TEXT",
        StoredValues::Real(_) => "REAL",
      };
      format!("{} {}", quote_ident(&c.name), sql_type)
    })
    .collect();
  tx.execute_batch(&format!(
    "CREATE TABLE {} ({});",
    quoted_table,
    column_defs.join(", ")
  )).map_err(|e| {
    FundError::DatabaseError(format!("Failed to create table '{}': {}", table_name, e))
  })?;

  let placeholders: Vec<String> = (1..=table_file.columns.len())
    .map(|i| format!("?{}", i))
    .collect();
  let insert_sql = format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quoted_table,
    table_file.columns.iter()
      .map(|c| quote_ident(&c.name))
      .collect::<Vec<_>>()
      .join(", "),
    placeholders.join(", ")
  );

  {
    let mut stmt = tx.prepare(&insert_sql).map_err(|e| {
      FundError::DatabaseError(format!("Failed to prepare insert for '{}': {}", table_name, e))
    })?;
    for row in 0..table_file.rows {
      let row_values: Vec<Value> = table_file.columns.iter()
        .map(|c| match &c.values {
          StoredValues::Text(v) => match v.get(row).and_then(|x| x.as_ref()) {
            Some(s) => Value::Text(s.clone()),
            None => Value::Null,
          },
          StoredValues::Real(v) => match v.get(row).and_then(|x| x.as_ref()) {
            Some(f) => Value::Real(*f),
            None => Value::Null,
          },
        })
        .collect();
      stmt.execute(params_from_iter(row_values)).map_err(|e| {
        FundError::DatabaseError(format!(
          "Failed to insert row {} into '{}': {}", row, table_name, e
        ))
      })?;
    }
  }

  tx.commit().map_err(|e| {
    FundError::DatabaseError(format!("Failed to commit '{}': {}", table_name, e))
  })?;
  info!("Loaded table '{}' ({} rows)", table_name, table_file.rows);
  Ok(())
}

/// Loads every exported columnar file in `export_dir` into the database,
/// table-per-file, named after the file stem. Returns the number of tables
/// loaded. A bad file is logged and skipped.
pub fn load_export_dir(export_dir: &Path, db_path: &Path) -> Result<usize, FundError> {
  let mut conn = Connection::open(db_path).map_err(|e| {
    FundError::DatabaseError(format!("Failed to open database {:?}: {}", db_path, e))
  })?;

  let pattern = format!("{}/*.json", export_dir.display());
  let paths = glob::glob(&pattern).map_err(|e| {
    FundError::ConfigurationError(format!("Bad glob pattern '{}': {}", pattern, e))
  })?;

  let mut loaded = 0;
  for entry in paths {
    let path = match entry {
      Ok(p) => p,
      Err(e) => {
        warn!("Skipping unreadable export entry: {}", e);
        continue;
      }
    };
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
      Some(s) => s.to_string(),
      None => {
        warn!("Skipping export file with unusable name: {:?}", path);
        continue;
      }
    };
    let table_file = match read_table_file(&path) {
      Ok(t) => t,
      Err(e) => {
        warn!("Skipping {:?}: {}", path, e);
        continue;
      }
    };
    replace_table(&mut conn, &stem, &table_file)?;
    loaded += 1;
  }
  Ok(loaded)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::export::{to_stored, write_table_file};
  use crate::table::Table;

  fn cell(s: &str) -> Option<String> {
    Some(s.to_string())
  }

  fn sample_table() -> Table {
    let mut t = Table::with_columns(["Issue Name", "52WKHIGH", "symbol"]);
    t.push_cell("Issue Name", cell("Ordinary Shares"));
    t.push_cell("52WKHIGH", cell("199.62"));
    t.push_cell("symbol", cell("AAPL"));
    t.push_cell("Issue Name", None);
    t.push_cell("52WKHIGH", cell("12.0"));
    t.push_cell("symbol", cell("MSFT"));
    t.pad_all_to(2);
    t
  }

  #[test]
  fn test_replace_table_round_trip() {
    let mut conn = Connection::open_in_memory().unwrap();
    let stored = to_stored(sample_table());
    replace_table(&mut conn, "ReportsFinStatements_issues", &stored).unwrap();

    let count: i64 = conn.query_row(
      "SELECT COUNT(*) FROM \"ReportsFinStatements_issues\"",
      [],
      |r| r.get(0),
    ).unwrap();
    assert_eq!(count, 2);

    // Numeric column landed as REAL, awkward identifiers survived quoting.
    let high: f64 = conn.query_row(
      "SELECT \"52WKHIGH\" FROM \"ReportsFinStatements_issues\" WHERE \"symbol\" = 'AAPL'",
      [],
      |r| r.get(0),
    ).unwrap();
    assert!((high - 199.62).abs() < 1e-9);

    let name: Option<String> = conn.query_row(
      "SELECT \"Issue Name\" FROM \"ReportsFinStatements_issues\" WHERE \"symbol\" = 'MSFT'",
      [],
      |r| r.get(0),
    ).unwrap();
    assert_eq!(name, None);
  }

  #[test]
  fn test_replace_table_replaces_previous_contents() {
    let mut conn = Connection::open_in_memory().unwrap();
    let stored = to_stored(sample_table());
    replace_table(&mut conn, "t", &stored).unwrap();

    let mut smaller = Table::with_columns(["symbol"]);
    smaller.push_cell("symbol", cell("NVDA"));
    replace_table(&mut conn, "t", &to_stored(smaller)).unwrap();

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM \"t\"", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1);
    let sym: String = conn.query_row("SELECT \"symbol\" FROM \"t\"", [], |r| r.get(0)).unwrap();
    assert_eq!(sym, "NVDA");
  }

  #[test]
  fn test_load_export_dir() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export");
    std::fs::create_dir_all(&export).unwrap();
    let db_path = dir.path().join("fundamentals.db");

    write_table_file(
      export.join("ReportSnapshot_ratios.json"),
      &to_stored(sample_table()),
    ).unwrap();
    write_table_file(
      export.join("RESC_actuals_annual.json"),
      &to_stored(sample_table()),
    ).unwrap();

    let loaded = load_export_dir(&export, &db_path).unwrap();
    assert_eq!(loaded, 2);

    let conn = Connection::open(&db_path).unwrap();
    let count: i64 = conn.query_row(
      "SELECT COUNT(*) FROM \"RESC_actuals_annual\"", [], |r| r.get(0),
    ).unwrap();
    assert_eq!(count, 2);
  }

  #[test]
  fn test_empty_table_file_is_skipped() {
    let mut conn = Connection::open_in_memory().unwrap();
    let stored = to_stored(Table::with_columns(["a"]));
    replace_table(&mut conn, "empty", &stored).unwrap();
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='empty'",
      [],
      |r| r.get(0),
    ).unwrap();
    assert_eq!(exists, 0);
  }
}
