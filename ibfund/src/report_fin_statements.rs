// ibfund/src/report_fin_statements.rs
// Mapping catalog and builders for the ReportsFinStatements family.
//
// The path strings and column names below are transcribed verbatim from the
// Reuters report schema; they are an external contract and must not be
// "fixed up" (including the historical `BlanceSheetDisplayCode` spelling).

use crate::base::FundError;
use crate::flatten::{flatten, Mapping};
use crate::report::SubReport;
use crate::table::Table;
use crate::xml_tree::{Element, Selector};

use once_cell::sync::Lazy;

pub(crate) static SUB_REPORTS: &[SubReport] = &[
  SubReport { name: "toplevel_info", build: toplevel_info },
  SubReport { name: "issues", build: issues },
  SubReport { name: "financial_statement_column_mapping", build: financial_statement_column_mapping },
  SubReport { name: "balance_sheet_annual", build: balance_sheet_annual },
  SubReport { name: "income_statement_annual", build: income_statement_annual },
  SubReport { name: "cash_flow_annual", build: cash_flow_annual },
  SubReport { name: "balance_sheet_interim", build: balance_sheet_interim },
  SubReport { name: "income_statement_interim", build: income_statement_interim },
  SubReport { name: "cash_flow_interim", build: cash_flow_interim },
];

static TOPLEVEL_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("RepNo", r#"CoIDs/CoID[@Type="RepNo"]"#)
    .value("CompanyName", r#"CoIDs/CoID[@Type="CompanyName"]"#)
    .value("IRSNo", r#"CoIDs/CoID[@Type="IRSNo"]"#)
    .value("CIKNo", r#"CoIDs/CoID[@Type="CIKNo"]"#)
    .value("OrganizationPermID", r#"CoIDs/CoID[@Type="OrganizationPermID"]"#)
    .value("CashFlowMethod", "StatementInfo/CashFlowMethod")
    .value("BalanceSheetDisplay", "StatementInfo/BalanceSheetDisplay")
    .value("COAType", "StatementInfo/COAType")
    .attribute("CashFlowMethodCode", "StatementInfo/CashFlowMethod", "Code")
    .attribute("BlanceSheetDisplayCode", "StatementInfo/BalanceSheetDisplay", "Code")
    .attribute("COATypeCode", "StatementInfo/COAType", "Code")
});

fn toplevel_info(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, ".", &TOPLEVEL_MAPPING)
}

static ISSUE_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("Issue Name", r#"IssueID[@Type="Name"]"#)
    .value("Issue Ticker", r#"IssueID[@Type="Ticker"]"#)
    .value("Issue RIC", r#"IssueID[@Type="RIC"]"#)
    .value("Issue DisplayRIC", r#"IssueID[@Type="DisplayRIC"]"#)
    .value("Issue InstrumentPI", r#"IssueID[@Type="InstrumentPI"]"#)
    .value("Issue QuotePI", r#"IssueID[@Type="QuotePI"]"#)
    .value("Issue InstrumentPermID", r#"IssueID[@Type="InstrumentPermID"]"#)
    .value("Issue QuotePermID", r#"IssueID[@Type="QuotePermID"]"#)
    .value("Issue Exchange", "Exchange")
    .value("Issue MostRecentSplit", "MostRecentSplit")
    .attribute("ExchangeCode", "Exchange", "Code")
    .attribute("ExchangeCountry", "Exchange", "Country")
    .attribute("MostRecentSplit Date", "MostRecentSplit", "Date")
    .broadcast("IssueID", "ID")
    .broadcast("IssueType", "Type")
    .broadcast("IssueDesc", "Desc")
    .broadcast("IssueOrder", "Order")
});

fn issues(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "Issues/Issue", &ISSUE_MAPPING)
}

static COA_MAP_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("ColumnDesc", "mapItem")
    .attribute("ColumnCode", "mapItem", "coaItem")
    .attribute("StatementType", "mapItem", "statementType")
    .attribute("lineID", "mapItem", "lineID")
    .attribute("precision", "mapItem", "precision")
});

fn financial_statement_column_mapping(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "FinancialStatements/COAMap", &COA_MAP_MAPPING)
}

// The fiscal-period attributes carried into every statement row.
const PERIOD_FIXED_ANNUAL: &[(&str, &str)] = &[
  ("FiscalPeriodType", "Type"),
  ("FiscalPeriodEndDate", "EndDate"),
  ("FiscalPeriodYear", "FiscalYear"),
];
const PERIOD_FIXED_INTERIM: &[(&str, &str)] = &[
  ("FiscalPeriodType", "Type"),
  ("FiscalPeriodEndDate", "EndDate"),
  ("FiscalPeriodYear", "FiscalYear"),
  ("FiscalPeriodNumber", "FiscalPeriodNumber"),
];

// COA codes valid for one statement type, discovered per document from the
// COAMap so the value columns track whatever this filing actually reports.
fn coa_items(doc: &Element, statement_type: &str) -> Result<Vec<String>, FundError> {
  let path = format!(
    "FinancialStatements/COAMap/mapItem[@statementType='{}']",
    statement_type
  );
  let sel = Selector::parse(&path)?;
  let mut items = Vec::new();
  for map_item in doc.find_all(&sel) {
    let code = map_item.attr("coaItem").ok_or_else(|| FundError::MissingAttribute {
      path: path.clone(),
      attribute: "coaItem".to_string(),
    })?;
    items.push(code.to_string());
  }
  Ok(items)
}

fn statement_mapping(
  coa_items: &[String],
  period_fixed: &[(&str, &str)],
  fixed_values: &[String],
) -> Mapping {
  let mut mapping = Mapping::new();
  for code in coa_items {
    mapping = mapping.value(code, &format!("lineItem[@coaCode='{}']", code));
  }
  mapping = mapping
    .value("PeriodLength", "FPHeader/PeriodLength")
    .value("periodType", "FPHeader/periodType")
    .value("UpdateType", "FPHeader/UpdateType")
    .value("StatementDate", "FPHeader/StatementDate")
    .value("Source", "FPHeader/Source")
    .attribute("periodTypeCode", "FPHeader/periodType", "Code")
    .attribute("UpdateTypeCode", "FPHeader/UpdateType", "Code")
    .attribute("SourceDate", "FPHeader/Source", "Date")
    .broadcast("StatementType", "Type");
  for ((column, _), value) in period_fixed.iter().zip(fixed_values) {
    mapping = mapping.fixed(column, value.clone());
  }
  mapping
}

/// Flattens one statement type across all fiscal periods of the requested
/// kind. The schema nests period -> statement -> line item, one repeating
/// level too deep for a single mapping, so the periods are iterated here and
/// each period's attributes ride along as fixed columns of the inner pass.
fn financial_statements(
  doc: &Element,
  period_type: &str,
  statement_type: &str,
) -> Result<Table, FundError> {
  let coa = coa_items(doc, statement_type)?;
  let period_fixed = if period_type == "Interim" { PERIOD_FIXED_INTERIM } else { PERIOD_FIXED_ANNUAL };

  let periods_path = format!(
    "FinancialStatements/{}Periods/FiscalPeriod[@Type=\"{}\"]",
    period_type, period_type
  );
  let periods_sel = Selector::parse(&periods_path)?;
  let periods = doc.find_all(&periods_sel);

  if periods.is_empty() {
    // No periods of this kind in the filing: a well-typed empty table so
    // cross-company concatenation still lines up.
    let placeholder: Vec<String> = period_fixed.iter().map(|_| String::new()).collect();
    return Ok(statement_mapping(&coa, period_fixed, &placeholder).empty_table());
  }

  let statement_path = format!("Statement[@Type='{}']", statement_type);
  let mut acc = Table::new();
  for period in periods {
    let mut fixed_values = Vec::with_capacity(period_fixed.len());
    for (_, attr) in period_fixed {
      let value = period.attr(attr).ok_or_else(|| FundError::MissingAttribute {
        path: periods_path.clone(),
        attribute: attr.to_string(),
      })?;
      fixed_values.push(value.to_string());
    }
    let mapping = statement_mapping(&coa, period_fixed, &fixed_values);
    acc.concat(flatten(period, &statement_path, &mapping)?);
  }
  Ok(acc)
}

fn balance_sheet_annual(doc: &Element) -> Result<Table, FundError> {
  financial_statements(doc, "Annual", "BAL")
}

fn income_statement_annual(doc: &Element) -> Result<Table, FundError> {
  financial_statements(doc, "Annual", "INC")
}

fn cash_flow_annual(doc: &Element) -> Result<Table, FundError> {
  financial_statements(doc, "Annual", "CAS")
}

fn balance_sheet_interim(doc: &Element) -> Result<Table, FundError> {
  financial_statements(doc, "Interim", "BAL")
}

fn income_statement_interim(doc: &Element) -> Result<Table, FundError> {
  financial_statements(doc, "Interim", "INC")
}

fn cash_flow_interim(doc: &Element) -> Result<Table, FundError> {
  financial_statements(doc, "Interim", "CAS")
}
