// ibfund/src/pipeline.rs
// Batch loop: per-company report files in, per-sub-report columnar files out.
//
// Unit of work is (company, report type, sub-report). A failing unit is
// logged and skipped; it never takes sibling sub-reports or other companies
// down with it.

use crate::base::FundError;
use crate::export::{to_stored, write_table_file};
use crate::report::ReportType;
use crate::table::Table;
use crate::xml_tree::{parse_document, Element};

use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A report file whose content starts with `[]` is the broker's "no data
/// available" placeholder and must be skipped before parsing is attempted.
pub fn is_empty_report(content: &str) -> bool {
  content.starts_with("[]")
}

/// Subdirectory names of the fundamentals directory, one per company,
/// sorted for deterministic processing order.
pub fn discover_companies(fundamentals_dir: &Path) -> Result<Vec<String>, FundError> {
  let mut companies = Vec::new();
  for entry in fs::read_dir(fundamentals_dir).map_err(|e| {
    FundError::IoError(format!("Failed to list {:?}: {}", fundamentals_dir, e))
  })? {
    let entry = entry.map_err(|e| FundError::IoError(e.to_string()))?;
    if entry.path().is_dir() {
      companies.push(entry.file_name().to_string_lossy().into_owned());
    }
  }
  companies.sort();
  Ok(companies)
}

/// Runs every sub-report builder of a family against one parsed document and
/// injects the caller context columns. Builder failures are logged and the
/// sub-report skipped.
pub fn flatten_report(
  doc: &Element,
  report_type: ReportType,
  symbol: &str,
) -> Vec<(&'static str, Table)> {
  let mut tables = Vec::new();
  for sub in report_type.sub_reports() {
    info!("Processing {} {} {}", symbol, report_type, sub.name);
    match (sub.build)(doc) {
      Ok(mut table) => {
        table.set_constant_column("symbol", symbol);
        table.set_constant_column("reportType", report_type.as_str());
        tables.push((sub.name, table));
      }
      Err(e) => {
        warn!(
          "Skipping {} {} {}: {}",
          symbol, report_type, sub.name, e
        );
      }
    }
  }
  tables
}

/// Processes every (company, report type) file under `fundamentals_dir` and
/// writes one columnar file per (report type, sub-report) to `export_dir`.
pub fn process_all(fundamentals_dir: &Path, export_dir: &Path) -> Result<(), FundError> {
  let companies = discover_companies(fundamentals_dir)?;
  info!("Found {} company directories in {:?}", companies.len(), fundamentals_dir);

  let mut results: HashMap<(ReportType, &'static str), Table> = HashMap::new();

  for report_type in ReportType::ALL {
    for company in &companies {
      let file_path = fundamentals_dir
        .join(company)
        .join(format!("{}.xml", report_type));
      if !file_path.exists() {
        continue;
      }
      let content = match fs::read_to_string(&file_path) {
        Ok(c) => c,
        Err(e) => {
          warn!("Failed to read {:?}: {}", file_path, e);
          continue;
        }
      };
      if is_empty_report(&content) {
        info!("File {}.xml for {} is empty. Skipping...", report_type, company);
        continue;
      }
      let doc = match parse_document(&content) {
        Ok(doc) => doc,
        Err(e) => {
          warn!("Failed to parse {:?}: {}", file_path, e);
          continue;
        }
      };
      for (sub_name, table) in flatten_report(&doc, report_type, company) {
        results.entry((report_type, sub_name))
          .or_insert_with(Table::new)
          .concat(table);
      }
    }
  }

  fs::create_dir_all(export_dir).map_err(|e| {
    FundError::IoError(format!("Failed to create {:?}: {}", export_dir, e))
  })?;

  // Write in catalog order so runs are deterministic.
  for report_type in ReportType::ALL {
    for sub in report_type.sub_reports() {
      if let Some(table) = results.remove(&(report_type, sub.name)) {
        let file_name = format!("{}_{}.json", report_type, sub.name);
        let stored = to_stored(table);
        write_table_file(export_dir.join(&file_name), &stored)?;
        info!("Processed {}_{}", report_type, sub.name);
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::export::read_table_file;
  use std::fs;

  fn cell(s: &str) -> Option<String> {
    Some(s.to_string())
  }

  const SNAPSHOT_XML: &str = r#"
<ReportSnapshot>
    <CoIDs>
        <CoID Type="RepNo">1</CoID>
        <CoID Type="CompanyName">Alpha Inc</CoID>
    </CoIDs>
    <Ratios PriceCurrency="USD" ReportingCurrency="USD" ExchangeRate="1.00" LatestAvailableDate="2024-01-31">
        <Group ID="Price and Volume">
            <Ratio FieldName="NPRICE" Type="N">10.5</Ratio>
        </Group>
    </Ratios>
</ReportSnapshot>
    "#;

  #[test]
  fn test_sentinel_detection() {
    assert!(is_empty_report("[]"));
    assert!(is_empty_report("[] trailing"));
    assert!(!is_empty_report("<ReportSnapshot/>"));
    assert!(!is_empty_report(""));
  }

  #[test]
  fn test_flatten_report_injects_context_columns() {
    let doc = parse_document(SNAPSHOT_XML).unwrap();
    let tables = flatten_report(&doc, ReportType::ReportSnapshot, "ALPHA");
    assert_eq!(tables.len(), ReportType::ReportSnapshot.sub_reports().len());
    let (_, ratios) = tables.iter().find(|(n, _)| *n == "ratios").unwrap();
    assert_eq!(ratios.column("symbol").unwrap(), &[cell("ALPHA")]);
    assert_eq!(ratios.column("reportType").unwrap(), &[cell("ReportSnapshot")]);
    assert_eq!(ratios.column("NPRICE").unwrap(), &[cell("10.5")]);
  }

  #[test]
  fn test_process_all_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let fundamentals = dir.path().join("fundamentals");
    let export = dir.path().join("export");

    // Two companies: one real snapshot, one no-data sentinel.
    fs::create_dir_all(fundamentals.join("ALPHA")).unwrap();
    fs::write(fundamentals.join("ALPHA/ReportSnapshot.xml"), SNAPSHOT_XML).unwrap();
    fs::create_dir_all(fundamentals.join("BETA")).unwrap();
    fs::write(fundamentals.join("BETA/ReportSnapshot.xml"), "[]").unwrap();

    process_all(&fundamentals, &export).unwrap();

    let ratios = read_table_file(export.join("ReportSnapshot_ratios.json")).unwrap();
    // Only ALPHA contributes rows; BETA was skipped before parsing.
    assert_eq!(ratios.rows, 1);
    let symbol = ratios.columns.iter().find(|c| c.name == "symbol").unwrap();
    assert_eq!(
      symbol.values,
      crate::export::StoredValues::Text(vec![cell("ALPHA")])
    );
    // No fin-statements files were present, so that family exported nothing.
    assert!(!export.join("ReportsFinStatements_toplevel_info.json").exists());
  }

  #[test]
  fn test_process_all_unions_differing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let fundamentals = dir.path().join("fundamentals");
    let export = dir.path().join("export");

    let alpha = r#"
<ReportSnapshot>
    <Ratios PriceCurrency="USD" ReportingCurrency="USD" ExchangeRate="1.0" LatestAvailableDate="2024-01-31">
        <Group ID="Price and Volume"><Ratio FieldName="NPRICE" Type="N">10.5</Ratio></Group>
    </Ratios>
</ReportSnapshot>
        "#;
    let beta = r#"
<ReportSnapshot>
    <Ratios PriceCurrency="EUR" ReportingCurrency="EUR" ExchangeRate="1.1" LatestAvailableDate="2024-02-29">
        <Group ID="Other Ratios"><Ratio FieldName="TTMGROSMGN" Type="N">40.0</Ratio></Group>
    </Ratios>
</ReportSnapshot>
        "#;
    fs::create_dir_all(fundamentals.join("ALPHA")).unwrap();
    fs::write(fundamentals.join("ALPHA/ReportSnapshot.xml"), alpha).unwrap();
    fs::create_dir_all(fundamentals.join("BETA")).unwrap();
    fs::write(fundamentals.join("BETA/ReportSnapshot.xml"), beta).unwrap();

    process_all(&fundamentals, &export).unwrap();

    let ratios = read_table_file(export.join("ReportSnapshot_ratios.json")).unwrap();
    assert_eq!(ratios.rows, 2);
    let nprice = ratios.columns.iter().find(|c| c.name == "NPRICE").unwrap();
    assert_eq!(
      nprice.values,
      crate::export::StoredValues::Real(vec![Some(10.5), None])
    );
    let grosmgn = ratios.columns.iter().find(|c| c.name == "TTMGROSMGN").unwrap();
    assert_eq!(
      grosmgn.values,
      crate::export::StoredValues::Real(vec![None, Some(40.0)])
    );
  }
}
