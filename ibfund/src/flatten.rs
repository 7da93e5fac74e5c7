// ibfund/src/flatten.rs
// Generic hierarchical-XML-to-table flattening engine.
//
// A `Mapping` declares which output column comes from which relative path
// under each collection element. `flatten` walks the matched collection in
// document order, appends every path match, then broadcasts parent-level
// attributes and caller-fixed literals across however many rows the element
// actually produced, padding ragged columns with nulls so the table stays
// rectangular after every element.

use crate::base::FundError;
use crate::table::Table;
use crate::xml_tree::{Element, Selector};

/// Where a mapped column's cells come from, relative to the collection
/// element being iterated.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
  /// Text content of every element matched by the path.
  Text(String),
  /// Named attribute of every element matched by the path. The attribute
  /// must exist on each match; a miss is a schema violation, not a null.
  Attribute(String, String),
}

/// One declared output column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
  pub column: String,
  pub source: FieldSource,
}

/// Immutable mapping specification for one flatten call. Column order is
/// declaration order: fields, then broadcast attributes, then fixed
/// literals. On a duplicate column name the first declaration wins and
/// later ones are discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
  fields: Vec<FieldSpec>,
  broadcast: Vec<(String, String)>,
  fixed: Vec<(String, String)>,
}

impl Mapping {
  pub fn new() -> Self {
    Mapping::default()
  }

  /// Declares a column fed by the text of elements at `path`.
  pub fn value(mut self, column: &str, path: &str) -> Self {
    self.fields.push(FieldSpec {
      column: column.to_string(),
      source: FieldSource::Text(path.to_string()),
    });
    self
  }

  /// Declares a column fed by attribute `attr` of elements at `path`.
  pub fn attribute(mut self, column: &str, path: &str, attr: &str) -> Self {
    self.fields.push(FieldSpec {
      column: column.to_string(),
      source: FieldSource::Attribute(path.to_string(), attr.to_string()),
    });
    self
  }

  /// Declares a column repeating attribute `attr` of the collection element
  /// itself across every row the element produces.
  pub fn broadcast(mut self, column: &str, attr: &str) -> Self {
    self.broadcast.push((column.to_string(), attr.to_string()));
    self
  }

  /// Declares a column repeating a caller-known literal across every row
  /// the element produces.
  pub fn fixed<V: Into<String>>(mut self, column: &str, value: V) -> Self {
    self.fixed.push((column.to_string(), value.into()));
    self
  }

  /// Declared column names in output order, duplicates removed
  /// (first definition wins).
  pub fn column_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let all = self.fields.iter().map(|f| f.column.as_str())
      .chain(self.broadcast.iter().map(|(c, _)| c.as_str()))
      .chain(self.fixed.iter().map(|(c, _)| c.as_str()));
    for name in all {
      if !names.contains(&name) {
        names.push(name);
      }
    }
    names
  }

  /// A table with this mapping's columns and zero rows. Used by callers of
  /// the two-pass composition when the outer collection is empty, so
  /// downstream concatenation still sees the full column set.
  pub fn empty_table(&self) -> Table {
    Table::with_columns(self.column_names())
  }
}

// A field with its selector parsed, duplicates already dropped.
struct ResolvedField<'m> {
  column: &'m str,
  source: &'m FieldSource,
  selector: Selector,
}

/// Flattens the elements matched by `collection_path` (relative to `root`,
/// which may be any sub-tree) into a table, one row group per matched
/// element. An empty collection yields the declared columns with zero rows.
pub fn flatten(root: &Element, collection_path: &str, mapping: &Mapping) -> Result<Table, FundError> {
  let collection_sel = Selector::parse(collection_path)?;

  // Resolve the effective column set once: first declaration wins, later
  // duplicates are discarded entirely.
  let mut declared: Vec<&str> = Vec::new();
  let mut fields: Vec<ResolvedField> = Vec::new();
  for spec in &mapping.fields {
    if declared.contains(&spec.column.as_str()) {
      continue;
    }
    declared.push(spec.column.as_str());
    let path = match &spec.source {
      FieldSource::Text(p) => p,
      FieldSource::Attribute(p, _) => p,
    };
    fields.push(ResolvedField {
      column: spec.column.as_str(),
      source: &spec.source,
      selector: Selector::parse(path)?,
    });
  }
  let mut broadcast: Vec<(&str, &str)> = Vec::new();
  for (column, attr) in &mapping.broadcast {
    if declared.contains(&column.as_str()) {
      continue;
    }
    declared.push(column.as_str());
    broadcast.push((column.as_str(), attr.as_str()));
  }
  let mut fixed: Vec<(&str, &str)> = Vec::new();
  for (column, value) in &mapping.fixed {
    if declared.contains(&column.as_str()) {
      continue;
    }
    declared.push(column.as_str());
    fixed.push((column.as_str(), value.as_str()));
  }

  let mut table = Table::with_columns(mapping.column_names());

  for el in root.find_all(&collection_sel) {
    let base = table.row_count();

    // Per-element row counter: the single source of truth for this
    // element's contribution.
    let mut group_rows = 0usize;
    for field in &fields {
      let matches = field.selector.select(el);
      group_rows = group_rows.max(matches.len());
      match field.source {
        FieldSource::Text(_) => {
          for m in matches {
            table.push_cell(field.column, m.text().map(str::to_string));
          }
        }
        FieldSource::Attribute(path, attr) => {
          for m in matches {
            let value = m.attr(attr).ok_or_else(|| FundError::MissingAttribute {
              path: path.clone(),
              attribute: attr.clone(),
            })?;
            table.push_cell(field.column, Some(value.to_string()));
          }
        }
      }
    }

    // Every element contributes at least one row, even if nothing matched.
    let target = base + group_rows.max(1);

    for (column, attr) in &broadcast {
      let value = el.attr(attr).ok_or_else(|| FundError::MissingAttribute {
        path: collection_path.to_string(),
        attribute: attr.to_string(),
      })?;
      table.fill_column_to(column, Some(value.to_string()), target);
    }
    for (column, value) in &fixed {
      table.fill_column_to(column, Some(value.to_string()), target);
    }

    table.pad_all_to(target);
  }

  Ok(table)
}
