// ibfund/src/report_snapshot.rs
// Mapping catalog and builders for the ReportSnapshot family.

use crate::base::FundError;
use crate::flatten::{flatten, Mapping};
use crate::report::SubReport;
use crate::table::Table;
use crate::xml_tree::Element;

use once_cell::sync::Lazy;

pub(crate) static SUB_REPORTS: &[SubReport] = &[
  SubReport { name: "toplevel_info", build: toplevel_info },
  SubReport { name: "issues", build: issues },
  SubReport { name: "ratios", build: ratios },
  SubReport { name: "forecast_data", build: forecast_data },
];

// The upstream schema dump listed IndustryInfo_lastUpdated twice with the
// identical (peerInfo, lastUpdated) source; a single entry carries it.
static TOPLEVEL_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("RepNo", r#"CoIDs/CoID[@Type="RepNo"]"#)
    .value("CompanyName", r#"CoIDs/CoID[@Type="CompanyName"]"#)
    .value("IRSNo", r#"CoIDs/CoID[@Type="IRSNo"]"#)
    .value("CIKNo", r#"CoIDs/CoID[@Type="CIKNo"]"#)
    .value("OrganizationPermID", r#"CoIDs/CoID[@Type="OrganizationPermID"]"#)
    .value("LatestAvailableAnnual", "CoGeneralInfo/LatestAvailableAnnual")
    .value("LatestAvailableInterim", "CoGeneralInfo/LatestAvailableInterim")
    .value("ReportingCurrency", "CoGeneralInfo/ReportingCurrency")
    .value("SharesOutstanding", "CoGeneralInfo/SharesOut")
    .value("Business Summary", r#"TextInfo/Text[@Type="Business Summary"]"#)
    .value("Financial Summary", r#"TextInfo/Text[@Type="Financial Summary"]"#)
    .value("IndustryInfo_TRBC", r#"peerInfo/IndustryInfo/Industry[@type="TRBC"][@order="1"]"#)
    .value("IndustryInfo_NAICS_1", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="1"]"#)
    .value("IndustryInfo_NAICS_2", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="2"]"#)
    .value("IndustryInfo_NAICS_3", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="3"]"#)
    .value("IndustryInfo_NAICS_4", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="4"]"#)
    .value("IndustryInfo_NAICS_5", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="5"]"#)
    .value("IndustryInfo_SIC_1", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="1"]"#)
    .value("IndustryInfo_SIC_2", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="2"]"#)
    .value("IndustryInfo_SIC_3", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="3"]"#)
    .value("IndustryInfo_SIC_4", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="4"]"#)
    .value("IndustryInfo_SIC_5", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="5"]"#)
    .value("website", r#"webLinks/webSite[@mainCategory="Home Page"]"#)
    .value("email", r#"webLinks/webSite[@mainCategory="Company Contact/E-mail"]"#)
    .attribute("CashFlowMethodCode", "StatementInfo/CashFlowMethod", "Code")
    .attribute("BlanceSheetDisplayCode", "StatementInfo/BalanceSheetDisplay", "Code")
    .attribute("COATypeCode", "StatementInfo/COAType", "Code")
    .attribute("IndustryInfo_lastUpdated", "peerInfo", "lastUpdated")
    .attribute("IndustryInfo_TRBC_Code", r#"peerInfo/IndustryInfo/Industry[@type="TRBC"][@order="1"]"#, "code")
    .attribute("IndustryInfo_NAICS_1_Code", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="1"]"#, "code")
    .attribute("IndustryInfo_NAICS_2_Code", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="2"]"#, "code")
    .attribute("IndustryInfo_NAICS_3_Code", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="3"]"#, "code")
    .attribute("IndustryInfo_NAICS_4_Code", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="4"]"#, "code")
    .attribute("IndustryInfo_NAICS_5_Code", r#"peerInfo/IndustryInfo/Industry[@type="NAICS"][@order="5"]"#, "code")
    .attribute("IndustryInfo_SIC_1Code", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="1"]"#, "code")
    .attribute("IndustryInfo_SIC_2Code", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="2"]"#, "code")
    .attribute("IndustryInfo_SIC_3Code", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="3"]"#, "code")
    .attribute("IndustryInfo_SIC_4Code", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="4"]"#, "code")
    .attribute("IndustryInfo_SIC_5Code", r#"peerInfo/IndustryInfo/Industry[@type="SIC"][@order="5"]"#, "code")
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

static RATIOS_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("NPRICE", r#"Group[@ID="Price and Volume"]/Ratio[@FieldName="NPRICE"]"#)
    .value("NHIG", r#"Group[@ID="Price and Volume"]/Ratio[@FieldName="NHIG"]"#)
    .value("NLOW", r#"Group[@ID="Price and Volume"]/Ratio[@FieldName="NLOW"]"#)
    .value("PDATE", r#"Group[@ID="Price and Volume"]/Ratio[@FieldName="PDATE"]"#)
    .value("VOL10DAVG", r#"Group[@ID="Price and Volume"]/Ratio[@FieldName="VOL10DAVG"]"#)
    .value("EV", r#"Group[@ID="Price and Volume"]/Ratio[@FieldName="EV"]"#)
    .value("MKTCAP", r#"Group[@ID="Income Statement"]/Ratio[@FieldName="MKTCAP"]"#)
    .value("TTMREV", r#"Group[@ID="Income Statement"]/Ratio[@FieldName="TTMREV"]"#)
    .value("TTMEBITD", r#"Group[@ID="Income Statement"]/Ratio[@FieldName="TTMEBITD"]"#)
    .value("TTMNIAC", r#"Group[@ID="Income Statement"]/Ratio[@FieldName="TTMNIAC"]"#)
    .value("TTMEPSXCLX", r#"Group[@ID="Per share data"]/Ratio[@FieldName="TTMEPSXCLX"]"#)
    .value("TTMREVPS", r#"Group[@ID="Per share data"]/Ratio[@FieldName="TTMREVPS"]"#)
    .value("QBVPS", r#"Group[@ID="Per share data"]/Ratio[@FieldName="QBVPS"]"#)
    .value("QCSHPS", r#"Group[@ID="Per share data"]/Ratio[@FieldName="QCSHPS"]"#)
    .value("TTMCFSHR", r#"Group[@ID="Per share data"]/Ratio[@FieldName="TTMCFSHR"]"#)
    .value("TTMDIVSHR", r#"Group[@ID="Per share data"]/Ratio[@FieldName="TTMDIVSHR"]"#)
    .value("TTMGROSMGN", r#"Group[@ID="Other Ratios"]/Ratio[@FieldName="TTMGROSMGN"]"#)
    .value("TTMROEPCT", r#"Group[@ID="Other Ratios"]/Ratio[@FieldName="TTMROEPCT"]"#)
    .value("TTMPR2REV", r#"Group[@ID="Other Ratios"]/Ratio[@FieldName="TTMPR2REV"]"#)
    .value("PEEXCLXOR", r#"Group[@ID="Other Ratios"]/Ratio[@FieldName="PEEXCLXOR"]"#)
    .value("PRICE2BK", r#"Group[@ID="Other Ratios"]/Ratio[@FieldName="PRICE2BK"]"#)
    .value("Employees", r#"Group[@ID="Other Ratios"]/Ratio[@FieldName="Employees"]"#)
    .broadcast("PriceCurrency", "PriceCurrency")
    .broadcast("ReportingCurrency", "ReportingCurrency")
    .broadcast("ExchangeRate", "ExchangeRate")
    .broadcast("LatestAvailableDate", "LatestAvailableDate")
});

fn ratios(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "Ratios", &RATIOS_MAPPING)
}

static FORECAST_MAPPING: Lazy<Mapping> = Lazy::new(|| {
  Mapping::new()
    .value("ConsRecom", r#"Ratio[@FieldName="ConsRecom"]/Value[@PeriodType="CURR"]"#)
    .value("TargetPrice", r#"Ratio[@FieldName="TargetPrice"]/Value[@PeriodType="CURR"]"#)
    .value("ProjLTGrowthRate", r#"Ratio[@FieldName="ProjLTGrowthRate"]/Value[@PeriodType="CURR"]"#)
    .value("ProjPE", r#"Ratio[@FieldName="ProjPE"]/Value[@PeriodType="CURR"]"#)
    .value("ProjSales", r#"Ratio[@FieldName="ProjSales"]/Value[@PeriodType="CURR"]"#)
    .value("ProjSalesQ", r#"Ratio[@FieldName="ProjSalesQ"]/Value[@PeriodType="CURR"]"#)
    .value("ProjEPS", r#"Ratio[@FieldName="ProjEPS"]/Value[@PeriodType="CURR"]"#)
    .value("ProjEPSQ", r#"Ratio[@FieldName="ProjEPSQ"]/Value[@PeriodType="CURR"]"#)
    .value("ProjProfit", r#"Ratio[@FieldName="ProjProfit"]/Value[@PeriodType="CURR"]"#)
    .value("ProjDPS", r#"Ratio[@FieldName="ProjDPS"]/Value[@PeriodType="CURR"]"#)
    .broadcast("ConsensusType", "ConsensusType")
    .broadcast("CurFiscalYear", "CurFiscalYear")
    .broadcast("CurFiscalYearEndMonth", "CurFiscalYearEndMonth")
    .broadcast("CurInterimEndCalYear", "CurInterimEndCalYear")
    .broadcast("CurInterimEndMonth", "CurInterimEndMonth")
    .broadcast("EarningsBasis", "EarningsBasis")
});

fn forecast_data(doc: &Element) -> Result<Table, FundError> {
  flatten(doc, "ForecastData", &FORECAST_MAPPING)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::xml_tree::parse_document;

  fn cell(s: &str) -> Option<String> {
    Some(s.to_string())
  }

  fn sample_snapshot_doc() -> Element {
    let xml = r#"
<ReportSnapshot>
    <CoIDs>
        <CoID Type="RepNo">8030</CoID>
        <CoID Type="CompanyName">Snap Corp</CoID>
        <CoID Type="CIKNo">0000012345</CoID>
    </CoIDs>
    <CoGeneralInfo>
        <LatestAvailableAnnual>2023-12-31</LatestAvailableAnnual>
        <LatestAvailableInterim>2024-03-31</LatestAvailableInterim>
        <ReportingCurrency Code="USD">U.S. Dollars</ReportingCurrency>
        <SharesOut Date="2024-04-19" TotalFloat="15000000000.0">15200000000.0</SharesOut>
    </CoGeneralInfo>
    <TextInfo>
        <Text Type="Business Summary" lastModified="2024-05-03T01:24:59">Snap Corp makes things.</Text>
        <Text Type="Financial Summary" lastModified="2024-04-14T01:30:59">BRIEF: for the quarter...</Text>
    </TextInfo>
    <peerInfo lastUpdated="2024-05-01T07:09:31">
        <IndustryInfo>
            <Industry type="TRBC" order="1" reported="0" code="5710601011" mnem="">Phones Manufacturing</Industry>
            <Industry type="NAICS" order="1" reported="0" code="334220" mnem="">Broadcast Equipment</Industry>
            <Industry type="SIC" order="1" reported="1" code="3571" mnem="">Electronic computers</Industry>
        </IndustryInfo>
    </peerInfo>
    <webLinks lastUpdated="2024-01-09T08:20:14">
        <webSite mainCategory="Home Page">https://www.snapcorp.example</webSite>
    </webLinks>
    <Issues>
        <Issue ID="1" Type="C" Desc="Common Stock" Order="1">
            <IssueID Type="Ticker">SNAP</IssueID>
            <Exchange Code="NASD" Country="USA">NASDAQ</Exchange>
        </Issue>
    </Issues>
    <Ratios PriceCurrency="USD" ReportingCurrency="USD" ExchangeRate="1.00" LatestAvailableDate="2023-12-31">
        <Group ID="Price and Volume">
            <Ratio FieldName="NPRICE" Type="N">167.04</Ratio>
            <Ratio FieldName="NHIG" Type="N">199.62</Ratio>
        </Group>
        <Group ID="Other Ratios">
            <Ratio FieldName="TTMGROSMGN" Type="N">45.59</Ratio>
        </Group>
    </Ratios>
    <ForecastData ConsensusType="Mean" CurFiscalYear="2024" CurFiscalYearEndMonth="9" CurInterimEndCalYear="2024" CurInterimEndMonth="6" EarningsBasis="PRX">
        <Ratio FieldName="ConsRecom" Type="N">
            <Value PeriodType="CURR">2.0</Value>
        </Ratio>
        <Ratio FieldName="TargetPrice" Type="N">
            <Value PeriodType="CURR">200.0</Value>
        </Ratio>
    </ForecastData>
</ReportSnapshot>
        "#;
    parse_document(xml).expect("fixture parse failed")
  }

  #[test]
  fn test_toplevel_info() {
    let doc = sample_snapshot_doc();
    let table = toplevel_info(&doc).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.column("CompanyName").unwrap(), &[cell("Snap Corp")]);
    assert_eq!(table.column("SharesOutstanding").unwrap(), &[cell("15200000000.0")]);
    assert_eq!(
      table.column("Business Summary").unwrap(),
      &[cell("Snap Corp makes things.")]
    );
    assert_eq!(
      table.column("IndustryInfo_lastUpdated").unwrap(),
      &[cell("2024-05-01T07:09:31")]
    );
    assert_eq!(table.column("IndustryInfo_TRBC_Code").unwrap(), &[cell("5710601011")]);
    assert_eq!(table.column("IndustryInfo_NAICS_1").unwrap(), &[cell("Broadcast Equipment")]);
    // Orders 2..5 are absent in this filing; the columns are present and null.
    assert_eq!(table.column("IndustryInfo_NAICS_2").unwrap(), &[None]);
    assert_eq!(table.column("website").unwrap(), &[cell("https://www.snapcorp.example")]);
    // No StatementInfo section in snapshots without it: columns exist, null.
    assert_eq!(table.column("CashFlowMethodCode").unwrap(), &[None]);
  }

  #[test]
  fn test_ratios_broadcast_currency_metadata() {
    let doc = sample_snapshot_doc();
    let table = ratios(&doc).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.column("NPRICE").unwrap(), &[cell("167.04")]);
    assert_eq!(table.column("TTMGROSMGN").unwrap(), &[cell("45.59")]);
    assert_eq!(table.column("EV").unwrap(), &[None]);
    assert_eq!(table.column("PriceCurrency").unwrap(), &[cell("USD")]);
    assert_eq!(table.column("LatestAvailableDate").unwrap(), &[cell("2023-12-31")]);
  }

  #[test]
  fn test_forecast_data() {
    let doc = sample_snapshot_doc();
    let table = forecast_data(&doc).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.column("ConsRecom").unwrap(), &[cell("2.0")]);
    assert_eq!(table.column("TargetPrice").unwrap(), &[cell("200.0")]);
    assert_eq!(table.column("ProjEPS").unwrap(), &[None]);
    assert_eq!(table.column("ConsensusType").unwrap(), &[cell("Mean")]);
    assert_eq!(table.column("EarningsBasis").unwrap(), &[cell("PRX")]);
  }

  #[test]
  fn test_issues() {
    let doc = sample_snapshot_doc();
    let table = issues(&doc).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.column("Issue Ticker").unwrap(), &[cell("SNAP")]);
    assert_eq!(table.column("ExchangeCountry").unwrap(), &[cell("USA")]);
    assert_eq!(table.column("IssueDesc").unwrap(), &[cell("Common Stock")]);
  }
}
