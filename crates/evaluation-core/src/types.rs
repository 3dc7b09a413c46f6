use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a payload arrived with all of its critical fields populated.
///
/// `Fallback` means downstream consumers should caveat anything derived from
/// the payload; it never changes control flow inside the fetch client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    #[default]
    Fallback,
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}

/// Provenance of corrected profile fields after market-cap reconciliation.
/// Consumed downstream to build "data notes" explanation text, so the field
/// names are part of the wire contract.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconciliationFlags {
    #[serde(default)]
    pub shares_calculated: bool,
    #[serde(default)]
    pub mkt_cap_calculated: bool,
    #[serde(default)]
    pub price_from_quote: bool,
    #[serde(default)]
    pub mkt_cap_from_metrics: bool,
}

impl ReconciliationFlags {
    pub fn any(&self) -> bool {
        self.shares_calculated
            || self.mkt_cap_calculated
            || self.price_from_quote
            || self.mkt_cap_from_metrics
    }
}

/// Company profile from the FMP `/profile/{ticker}` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "companyName", default)]
    pub company_name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "mktCap", default)]
    pub mkt_cap: Option<f64>,
    #[serde(rename = "sharesOutstanding", default)]
    pub shares_outstanding: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(rename = "exchangeShortName", default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub ceo: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "ipoDate", default)]
    pub ipo_date: Option<String>,
    #[serde(rename = "isActivelyTrading", default)]
    pub is_actively_trading: Option<bool>,

    /// Set by the fetch client, not part of the upstream payload.
    #[serde(rename = "profile_freshness", default)]
    pub freshness: Freshness,
    #[serde(default)]
    pub reconciliation: ReconciliationFlags,
}

/// Annual income statement from `/income-statement/{ticker}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeStatement {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(rename = "grossProfit", default)]
    pub gross_profit: Option<f64>,
    #[serde(rename = "grossProfitRatio", default)]
    pub gross_profit_ratio: Option<f64>,
    #[serde(rename = "operatingIncome", default)]
    pub operating_income: Option<f64>,
    #[serde(rename = "operatingIncomeRatio", default)]
    pub operating_income_ratio: Option<f64>,
    #[serde(rename = "netIncome", default)]
    pub net_income: Option<f64>,
    #[serde(rename = "netIncomeRatio", default)]
    pub net_income_ratio: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default)]
    pub ebitda: Option<f64>,
}

/// Annual balance sheet from `/balance-sheet-statement/{ticker}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "totalAssets", default)]
    pub total_assets: Option<f64>,
    #[serde(rename = "totalLiabilities", default)]
    pub total_liabilities: Option<f64>,
    #[serde(rename = "totalStockholdersEquity", default)]
    pub total_stockholders_equity: Option<f64>,
    #[serde(rename = "totalCurrentAssets", default)]
    pub total_current_assets: Option<f64>,
    #[serde(rename = "totalCurrentLiabilities", default)]
    pub total_current_liabilities: Option<f64>,
    #[serde(rename = "cashAndCashEquivalents", default)]
    pub cash_and_cash_equivalents: Option<f64>,
    #[serde(rename = "totalDebt", default)]
    pub total_debt: Option<f64>,
}

/// Annual cash flow statement from `/cash-flow-statement/{ticker}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "operatingCashFlow", default)]
    pub operating_cash_flow: Option<f64>,
    #[serde(rename = "capitalExpenditure", default)]
    pub capital_expenditure: Option<f64>,
    #[serde(rename = "freeCashFlow", default)]
    pub free_cash_flow: Option<f64>,
    #[serde(rename = "dividendsPaid", default)]
    pub dividends_paid: Option<f64>,
    #[serde(rename = "netCashUsedProvidedByFinancingActivities", default)]
    pub financing_cash_flow: Option<f64>,
}

/// The three statement histories fetched together for one ticker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub income: Vec<IncomeStatement>,
    pub balance: Vec<BalanceSheet>,
    pub cashflow: Vec<CashFlowStatement>,
}

/// Key metrics from `/key-metrics/{ticker}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyMetrics {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "marketCap", default)]
    pub market_cap: Option<f64>,
    #[serde(rename = "revenuePerShare", default)]
    pub revenue_per_share: Option<f64>,
    #[serde(rename = "netIncomePerShare", default)]
    pub net_income_per_share: Option<f64>,
    #[serde(rename = "freeCashFlowPerShare", default)]
    pub free_cash_flow_per_share: Option<f64>,
    #[serde(rename = "bookValuePerShare", default)]
    pub book_value_per_share: Option<f64>,
    #[serde(rename = "peRatio", default)]
    pub pe_ratio: Option<f64>,
    #[serde(rename = "priceToSalesRatio", default)]
    pub price_to_sales_ratio: Option<f64>,
    #[serde(rename = "debtToEquity", default)]
    pub debt_to_equity: Option<f64>,
    #[serde(rename = "dividendYield", default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,

    /// Set by the fetch client on the most recent entry.
    #[serde(rename = "metrics_freshness", default)]
    pub freshness: Freshness,
}

/// Financial ratios from `/ratios/{ticker}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialRatios {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "currentRatio", default)]
    pub current_ratio: Option<f64>,
    #[serde(rename = "quickRatio", default)]
    pub quick_ratio: Option<f64>,
    #[serde(rename = "debtEquityRatio", default)]
    pub debt_equity_ratio: Option<f64>,
    #[serde(rename = "returnOnEquity", default)]
    pub return_on_equity: Option<f64>,
    #[serde(rename = "returnOnAssets", default)]
    pub return_on_assets: Option<f64>,
    #[serde(rename = "grossProfitMargin", default)]
    pub gross_profit_margin: Option<f64>,
    #[serde(rename = "operatingProfitMargin", default)]
    pub operating_profit_margin: Option<f64>,
    #[serde(rename = "netProfitMargin", default)]
    pub net_profit_margin: Option<f64>,
    #[serde(rename = "priceEarningsRatio", default)]
    pub price_earnings_ratio: Option<f64>,
    #[serde(rename = "priceToBookRatio", default)]
    pub price_to_book_ratio: Option<f64>,
    #[serde(rename = "interestCoverage", default)]
    pub interest_coverage: Option<f64>,
}

/// One insider transaction from `/insider-trading`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsiderTransaction {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "filingDate", default)]
    pub filing_date: Option<String>,
    #[serde(rename = "transactionDate", default)]
    pub transaction_date: Option<String>,
    #[serde(rename = "reportingName", default)]
    pub reporting_name: Option<String>,
    #[serde(rename = "typeOfOwner", default)]
    pub type_of_owner: Option<String>,
    /// e.g. "P-Purchase" or "S-Sale"
    #[serde(rename = "transactionType", default)]
    pub transaction_type: Option<String>,
    #[serde(rename = "securitiesTransacted", default)]
    pub securities_transacted: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Real-time quote from `/quote/{ticker}`. Used to backfill price and shares
/// when the profile payload is incomplete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockQuote {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "marketCap", default)]
    pub market_cap: Option<f64>,
    #[serde(rename = "sharesOutstanding", default)]
    pub shares_outstanding: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(rename = "previousClose", default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A news search hit for a company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Read-only snapshot of one credential's quota bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub remaining: u32,
    pub daily_limit: u32,
    pub minute_limit: u32,
    pub last_call_time: Option<DateTime<Utc>>,
}
