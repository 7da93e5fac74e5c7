// ibfund/src/report.rs
// Report families and their sub-report registries.

use crate::base::FundError;
use crate::table::Table;
use crate::xml_tree::Element;

/// Builds one sub-report table from a parsed report document.
pub type SubReportFn = fn(&Element) -> Result<Table, FundError>;

/// One named, independently flattened facet of a report family.
pub struct SubReport {
  pub name: &'static str,
  pub build: SubReportFn,
}

/// The fundamental report families processed by this crate. The string
/// names match the TWS request/report type strings and the on-disk file
/// names (`fundamentals/{symbol}/{name}.xml`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
  /// Detailed financial statements (Income, Balance Sheet, Cash Flow).
  ReportsFinStatements,
  /// Company overview, ratios, forecast data.
  ReportSnapshot,
  /// Analyst estimates and consensus data.
  RESC,
}

impl ReportType {
  pub const ALL: [ReportType; 3] = [
    ReportType::ReportsFinStatements,
    ReportType::ReportSnapshot,
    ReportType::RESC,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ReportType::ReportsFinStatements => "ReportsFinStatements",
      ReportType::ReportSnapshot => "ReportSnapshot",
      ReportType::RESC => "RESC",
    }
  }

  /// The sub-reports extracted from this family, in catalog order.
  pub fn sub_reports(&self) -> &'static [SubReport] {
    match self {
      ReportType::ReportsFinStatements => crate::report_fin_statements::SUB_REPORTS,
      ReportType::ReportSnapshot => crate::report_snapshot::SUB_REPORTS,
      ReportType::RESC => crate::report_resc::SUB_REPORTS,
    }
  }
}

impl std::fmt::Display for ReportType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wire_names() {
    assert_eq!(ReportType::ReportsFinStatements.as_str(), "ReportsFinStatements");
    assert_eq!(ReportType::ReportSnapshot.as_str(), "ReportSnapshot");
    assert_eq!(ReportType::RESC.as_str(), "RESC");
  }

  #[test]
  fn test_registries_are_nonempty_and_distinct() {
    for rt in ReportType::ALL {
      let subs = rt.sub_reports();
      assert!(!subs.is_empty(), "{} has no sub-reports", rt);
      let mut names: Vec<&str> = subs.iter().map(|s| s.name).collect();
      names.sort_unstable();
      names.dedup();
      assert_eq!(names.len(), subs.len(), "duplicate sub-report names in {}", rt);
    }
  }
}
