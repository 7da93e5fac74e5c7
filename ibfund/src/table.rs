// ibfund/src/table.rs
// Column-oriented table accumulator.
//
// A `Table` is an ordered sequence of named columns of optional string
// cells. Columns are kept at equal length at every public observation
// point; the flattening engine appends ragged per-element contributions and
// reconciles them with `pad_all_to` before handing the table back.

/// One named column of nullable string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
  pub name: String,
  pub values: Vec<Option<String>>,
}

/// An ordered collection of named columns, aligned by row index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
  columns: Vec<Column>,
}

impl Table {
  pub fn new() -> Self {
    Table { columns: Vec::new() }
  }

  /// Creates a table with the given column names and zero rows. Duplicate
  /// names keep their first position only.
  pub fn with_columns<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut table = Table::new();
    for name in names {
      table.declare_column(name.into());
    }
    table
  }

  /// Adds a column if it does not exist yet; first definition wins.
  pub fn declare_column(&mut self, name: String) {
    if self.column_index(&name).is_none() {
      let fill = self.row_count();
      self.columns.push(Column { name, values: vec![None; fill] });
    }
  }

  fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c.name == name)
  }

  pub fn column_names(&self) -> impl Iterator<Item = &str> {
    self.columns.iter().map(|c| c.name.as_str())
  }

  pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
    self.column_index(name).map(|i| self.columns[i].values.as_slice())
  }

  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  pub fn column_count(&self) -> usize {
    self.columns.len()
  }

  /// Number of rows. Columns may transiently be ragged while a row group is
  /// under construction; the row count is the longest column.
  pub fn row_count(&self) -> usize {
    self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
  }

  /// Appends one cell to the named column. The column must exist.
  pub fn push_cell(&mut self, name: &str, value: Option<String>) {
    let idx = self.column_index(name)
      .unwrap_or_else(|| panic!("push_cell on undeclared column '{}'", name));
    self.columns[idx].values.push(value);
  }

  pub fn column_len(&self, name: &str) -> usize {
    self.column_index(name).map(|i| self.columns[i].values.len()).unwrap_or(0)
  }

  /// Appends `value` to the named column until it reaches `len`.
  pub fn fill_column_to(&mut self, name: &str, value: Option<String>, len: usize) {
    if let Some(idx) = self.column_index(name) {
      let col = &mut self.columns[idx].values;
      while col.len() < len {
        col.push(value.clone());
      }
    }
  }

  /// Pads every column with nulls up to `len`.
  pub fn pad_all_to(&mut self, len: usize) {
    for col in &mut self.columns {
      while col.values.len() < len {
        col.values.push(None);
      }
    }
  }

  /// Adds (or replaces) a column holding `value` in every existing row.
  pub fn set_constant_column(&mut self, name: &str, value: &str) {
    let rows = self.row_count();
    let values = vec![Some(value.to_string()); rows];
    match self.column_index(name) {
      Some(idx) => self.columns[idx].values = values,
      None => self.columns.push(Column { name: name.to_string(), values }),
    }
  }

  /// Row-wise concatenation with column-set union. Columns missing on
  /// either side are null-filled, so differing shapes never drop data.
  pub fn concat(&mut self, other: Table) {
    let self_rows = self.row_count();
    let other_rows = other.row_count();
    for col in other.columns {
      match self.column_index(&col.name) {
        Some(idx) => self.columns[idx].values.extend(col.values),
        None => {
          let mut values = vec![None; self_rows];
          values.extend(col.values);
          self.columns.push(Column { name: col.name, values });
        }
      }
    }
    // Columns present only on this side get nulls for the new rows.
    self.pad_all_to(self_rows + other_rows);
  }

  /// Removes columns whose cells are all null. Returns the removed names.
  pub fn drop_null_columns(&mut self) -> Vec<String> {
    let mut dropped = Vec::new();
    self.columns.retain(|c| {
      if c.values.iter().all(|v| v.is_none()) {
        dropped.push(c.name.clone());
        false
      } else {
        true
      }
    });
    dropped
  }
}
