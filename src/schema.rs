use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AdRecord, CustomerRecord, FinancialRecord, SalesRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    Sales,
    AdPerformance,
    Financial,
    Customer,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Sales,
        DatasetKind::AdPerformance,
        DatasetKind::Financial,
        DatasetKind::Customer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Sales => "sales",
            DatasetKind::AdPerformance => "ad performance",
            DatasetKind::Financial => "financial",
            DatasetKind::Customer => "customer",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            DatasetKind::Sales => "innovategear_sales_data.csv",
            DatasetKind::AdPerformance => "ad_performance_data.csv",
            DatasetKind::Financial => "financial_data.csv",
            DatasetKind::Customer => "customer_intelligence_data.csv",
        }
    }

    /// Columns a file must carry before any row is read.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Sales => &[
                "OrderDate",
                "CustomerName",
                "State",
                "Category",
                "Quantity",
                "Price",
                "MarketingSource",
                "SatisfactionScore",
            ],
            DatasetKind::AdPerformance => &[
                "Date",
                "Platform",
                "Campaign",
                "CreativeType",
                "CreativeName",
                "Impressions",
                "Clicks",
                "Spend",
                "Conversions",
                "Revenue",
            ],
            DatasetKind::Financial => &["Date", "Type", "Category", "Amount"],
            DatasetKind::Customer => &[
                "CustomerID",
                "CustomerName",
                "LastPurchaseDate",
                "PurchaseFrequency",
                "AvgOrderValue",
                "SupportTickets",
                "EngagementScore",
                "HealthScore",
                "ChurnRisk",
                "PredictedLTV",
                "SentimentHistory",
            ],
        }
    }

    pub fn validate_headers<S: AsRef<str>>(&self, headers: &[S]) -> EngineResult<()> {
        let missing: Vec<String> = self
            .required_columns()
            .iter()
            .filter(|column| !headers.iter().any(|header| header.as_ref() == **column))
            .map(|column| column.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::SchemaMismatch {
                dataset: self.name(),
                missing,
            })
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record type bound to the dataset schema it is read from.
pub trait Dataset: DeserializeOwned {
    const KIND: DatasetKind;
}

impl Dataset for SalesRecord {
    const KIND: DatasetKind = DatasetKind::Sales;
}

impl Dataset for AdRecord {
    const KIND: DatasetKind = DatasetKind::AdPerformance;
}

impl Dataset for FinancialRecord {
    const KIND: DatasetKind = DatasetKind::Financial;
}

impl Dataset for CustomerRecord {
    const KIND: DatasetKind = DatasetKind::Customer;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_header_passes() {
        let headers = ["Date", "Type", "Category", "Amount", "Extra"];
        assert!(DatasetKind::Financial.validate_headers(&headers).is_ok());
    }

    #[test]
    fn missing_columns_are_listed_in_schema_order() {
        let headers = ["Date", "Platform", "Spend"];
        match DatasetKind::AdPerformance.validate_headers(&headers) {
            Err(EngineError::SchemaMismatch { dataset, missing }) => {
                assert_eq!(dataset, "ad performance");
                assert_eq!(missing.first().map(String::as_str), Some("Campaign"));
                assert!(missing.contains(&"Revenue".to_string()));
                assert!(!missing.contains(&"Spend".to_string()));
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn header_match_is_case_sensitive() {
        let headers = ["date", "type", "category", "amount"];
        assert!(DatasetKind::Financial.validate_headers(&headers).is_err());
    }
}
