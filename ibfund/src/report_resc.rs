// ibfund/src/report_resc.rs
// Mapping catalog and builders for the RESC (analyst estimates) family.
//
// Path strings transcribed verbatim from the Reuters consensus-estimate
// schema, including the market-data entries that all read the CLPRICE item
// in the upstream catalog.

use crate::base::FundError;
use crate::flatten::{flatten, Mapping};
use crate::report::SubReport;
use crate::table::Table;
use crate::xml_tree::{Element, Selector};

use once_cell::sync::Lazy;

pub(crate) static SUB_REPORTS: &[SubReport] = &[
  SubReport { name: "security_info", build: security_info },
  SubReport { name: "company_profile", build: company_profile },
  SubReport { name: "periods_annual", build: periods_annual },
  SubReport { name: "periods_interim", build: periods_interim },
  SubReport { name: "actuals_annual", build: actuals_annual },
  SubReport { name: "actuals_interim", build: actuals_interim },
  SubReport { name: "fiscal_year_estimates_annual", build: fiscal_year_estimates_annual },
  SubReport { name: "fiscal_year_estimates_interim", build: fiscal_year_estimates_interim },
  SubReport { name: "net_profit_estimates", build: net_profit_estimates },
];

static SECURITY_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("ISIN", "SecIds/SecId[@type='ISIN']")
    .value("RIC", "SecIds/SecId[@type='RIC']")
    .value("TICKER", "SecIds/SecId[@type='TICKER']")
    .value("InstrumentPI", "SecIds/SecId[@type='InstrumentPI']")
    .value("CLPRICE", "MarketData/MarketDataItem[@type='CLPRICE']")
    .value("MARKETCAP", "MarketData/MarketDataItem[@type='CLPRICE']")
    .value("52WKHIGH", "MarketData/MarketDataItem[@type='CLPRICE']")
    .value("52WKLOW", "MarketData/MarketDataItem[@type='CLPRICE']")
    .attribute("CLPRICE_Unit", "MarketData/MarketDataItem[@type='CLPRICE']", "unit")
    .attribute("CLPRICE_CurrCode", "MarketData/MarketDataItem[@type='CLPRICE']", "currCode")
    .attribute("MARKETCAP_Unit", "MarketData/MarketDataItem[@type='MARKETCAP']", "unit")
    .attribute("MARKETCAP_CurrCode", "MarketData/MarketDataItem[@type='MARKETCAP']", "currCode")
    .attribute("52WKHIGH_Unit", "MarketData/MarketDataItem[@type='52WKHIGH']", "unit")
    .attribute("52WKHIGH_CurrCode", "MarketData/MarketDataItem[@type='52WKHIGH']", "currCode")
    .attribute("52WKLOW_Unit", "MarketData/MarketDataItem[@type='52WKLOW']", "unit")
    .attribute("52WKLOW_CurrCode", "MarketData/MarketDataItem[@type='52WKLOW']", "currCode")
    .broadcast("code", "code")
});

fn security_info(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "Company/SecurityInfo/Security", &SECURITY_MAPPING)
}

static COMPANY_PROFILE_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("name", "CoName/Name")
    .value("RepNo", "CoIds/CoId[@type='RepNo']")
    .value("IssueID", "CoIds/CoId[@type='IssueID']")
    .value("IsPrimaryIssue", "CoIds/CoId[@type='IsPrimaryIssue']")
    .value("sectorName", "CompanyInfo/Sector")
    .value("primaryConsensus", "CompanyInfo/Primary[@type='Consensus']")
    .value("primaryEstimate", "CompanyInfo/Primary[@type='Estimate']")
    .value("Currency", "CompanyInfo/Currency")
    .attribute("sectorCode", "CompanyInfo/Sector", "code")
    .attribute("sectorSet", "CompanyInfo/Sector", "set")
    .attribute("curFiscalPeriod_fyear", "CompanyInfo/CurFiscalPeriod", "fYear")
    .attribute("curFiscalPeriod_fyem", "CompanyInfo/CurFiscalPeriod", "fyem")
    .attribute("curFiscalPeriod_periodType", "CompanyInfo/CurFiscalPeriod", "periodType")
});

fn company_profile(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "Company", &COMPANY_PROFILE_MAPPING)
}

static PERIODS_ANNUAL_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .broadcast("fYear", "fYear")
    .broadcast("periodLength", "periodLength")
    .broadcast("periodUnit", "periodUnit")
    .broadcast("endMonth", "endMonth")
    .broadcast("fyNum", "fyNum")
});

fn periods_annual(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "Company/CompanyInfo/CompanyPeriods/Annual", &PERIODS_ANNUAL_MAPPING)
}

static PERIODS_INTERIM_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .broadcast("type", "type")
    .broadcast("periodNum", "periodNum")
    .broadcast("periodLength", "periodLength")
    .broadcast("periodUnit", "periodUnit")
    .broadcast("endMonth", "endMonth")
    .broadcast("endCalYear", "endCalYear")
});

fn periods_interim(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "Company/CompanyInfo/CompanyPeriods/Annual/Interim", &PERIODS_INTERIM_MAPPING)
}

fn actuals_mapping(period_type: &str) -> Mapping {
  let fy_period = format!("FYPeriod[@periodType='{}']", period_type);
  let act_value = format!("FYPeriod[@periodType='{}']/ActValue", period_type);
  Mapping::new()
    .value("ActValue", &act_value)
    .attribute("fYear", &fy_period, "fYear")
    .attribute("endMonth", &fy_period, "endMonth")
    .attribute("endCalYear", &fy_period, "endCalYear")
    .attribute("updated", &act_value, "updated")
    .broadcast("actualType", "type")
    .broadcast("actualUnit", "unit")
}

fn actuals(doc: &Element, period_type: &str) -> Result<Table, FundError> {
  flatten(doc, "Actuals/FYActuals/FYActual", &actuals_mapping(period_type))
}

fn actuals_annual(doc: &Element) -> Result<Table, FundError> {
  actuals(doc, "A")
}

fn actuals_interim(doc: &Element) -> Result<Table, FundError> {
  actuals(doc, "Q")
}

fn fy_estimate_mapping(estimate_type: &str, unit: &str) -> Mapping {
  Mapping::new()
    .value("high_curr", "ConsEstimate[@type='High']/ConsValue[@dateType='CURR']")
    .value("low_curr", "ConsEstimate[@type='Low']/ConsValue[@dateType='CURR']")
    .value("mean_curr", "ConsEstimate[@type='Mean']/ConsValue[@dateType='CURR']")
    .value("mean_1ma", "ConsEstimate[@type='Mean']/ConsValue[@dateType='1MA']")
    .value("mean_3ma", "ConsEstimate[@type='Mean']/ConsValue[@dateType='3MA']")
    .value("median_curr", "ConsEstimate[@type='Median']/ConsValue[@dateType='CURR']")
    .value("stdev_curr", "ConsEstimate[@type='StdDev']/ConsValue[@dateType='CURR']")
    .value("numberOfEst_curr", "ConsEstimate[@type='NumOfEst']/ConsValue[@dateType='CURR']")
    .broadcast("fYear", "fYear")
    .broadcast("endMonth", "endMonth")
    .broadcast("endCalYear", "endCalYear")
    .fixed("type", estimate_type)
    .fixed("unit", unit)
}

/// Estimates nest measure -> period -> statistic, one repeating level too
/// deep for a single mapping: each FYEstimate's own type/unit attributes are
/// extracted here and ride along as fixed columns of the inner pass over its
/// fiscal periods.
fn fiscal_year_estimates(doc: &Element, period_type: &str) -> Result<Table, FundError> {
  let estimates_path = "ConsEstimates/FYEstimates/FYEstimate";
  let estimates_sel = Selector::parse(estimates_path)?;
  let estimates = doc.find_all(&estimates_sel);

  if estimates.is_empty() {
    return Ok(fy_estimate_mapping("", "").empty_table());
  }

  let period_path = format!("FYPeriod[@periodType='{}']", period_type);
  let mut acc = Table::new();
  for estimate in estimates {
    let estimate_type = estimate.attr("type").ok_or_else(|| FundError::MissingAttribute {
      path: estimates_path.to_string(),
      attribute: "type".to_string(),
    })?;
    let unit = estimate.attr("unit").ok_or_else(|| FundError::MissingAttribute {
      path: estimates_path.to_string(),
      attribute: "unit".to_string(),
    })?;
    let mapping = fy_estimate_mapping(estimate_type, unit);
    acc.concat(flatten(estimate, &period_path, &mapping)?);
  }
  Ok(acc)
}

fn fiscal_year_estimates_annual(doc: &Element) -> Result<Table, FundError> {
  fiscal_year_estimates(doc, "A")
}

fn fiscal_year_estimates_interim(doc: &Element) -> Result<Table, FundError> {
  fiscal_year_estimates(doc, "Q")
}

static NP_ESTIMATE_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("high_curr", "ConsEstimate[@type='High']/ConsValue[@dateType='CURR']")
    .value("low_curr", "ConsEstimate[@type='Low']/ConsValue[@dateType='CURR']")
    .value("mean_curr", "ConsEstimate[@type='Mean']/ConsValue[@dateType='CURR']")
    .value("median_curr", "ConsEstimate[@type='Median']/ConsValue[@dateType='CURR']")
    .broadcast("type", "type")
    .broadcast("unit", "unit")
});

fn net_profit_estimates(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "ConsEstimates/NPEstimates/NPEstimate", &NP_ESTIMATE_MAPPING)
}
