use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of monthly points carried in a customer's sentiment history.
pub const SENTIMENT_MONTHS: usize = 12;

/// Row-level access used by the generic aggregator.
pub trait Measurable {
    /// Numeric columns that the aggregator sums.
    const MEASURES: &'static [&'static str];

    /// Categorical value of the named column.
    fn dimension(&self, column: &str) -> Option<&str>;

    /// Numeric value of the named column.
    fn measure(&self, column: &str) -> Option<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SalesRecord {
    #[serde(rename = "OrderID", default)]
    pub order_id: Option<String>,
    pub order_date: NaiveDate,
    pub customer_name: String,
    pub state: String,
    #[serde(default)]
    pub product: Option<String>,
    pub category: String,
    pub quantity: u32,
    pub price: f64,
    pub marketing_source: String,
    pub satisfaction_score: u8,
}

impl SalesRecord {
    pub fn total_revenue(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

impl Measurable for SalesRecord {
    const MEASURES: &'static [&'static str] =
        &["Quantity", "Price", "TotalRevenue", "SatisfactionScore"];

    fn dimension(&self, column: &str) -> Option<&str> {
        match column {
            "CustomerName" => Some(&self.customer_name),
            "State" => Some(&self.state),
            "Category" => Some(&self.category),
            "MarketingSource" => Some(&self.marketing_source),
            "Product" => self.product.as_deref(),
            _ => None,
        }
    }

    fn measure(&self, column: &str) -> Option<f64> {
        match column {
            "Quantity" => Some(f64::from(self.quantity)),
            "Price" => Some(self.price),
            "TotalRevenue" => Some(self.total_revenue()),
            "SatisfactionScore" => Some(f64::from(self.satisfaction_score)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdRecord {
    pub date: NaiveDate,
    pub platform: String,
    pub campaign: String,
    pub creative_type: String,
    pub creative_name: String,
    pub impressions: f64,
    pub clicks: f64,
    pub spend: f64,
    pub conversions: f64,
    pub revenue: f64,
}

impl Measurable for AdRecord {
    const MEASURES: &'static [&'static str] =
        &["Impressions", "Clicks", "Spend", "Conversions", "Revenue"];

    fn dimension(&self, column: &str) -> Option<&str> {
        match column {
            "Platform" => Some(&self.platform),
            "Campaign" => Some(&self.campaign),
            "CreativeType" => Some(&self.creative_type),
            "CreativeName" => Some(&self.creative_name),
            _ => None,
        }
    }

    fn measure(&self, column: &str) -> Option<f64> {
        match column {
            "Impressions" => Some(self.impressions),
            "Clicks" => Some(self.clicks),
            "Spend" => Some(self.spend),
            "Conversions" => Some(self.conversions),
            "Revenue" => Some(self.revenue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FinancialRecord {
    pub date: NaiveDate,
    #[serde(rename = "Type")]
    pub kind: TransactionType,
    pub category: String,
    pub amount: f64,
}

impl Measurable for FinancialRecord {
    const MEASURES: &'static [&'static str] = &["Amount"];

    fn dimension(&self, column: &str) -> Option<&str> {
        match column {
            "Type" => Some(self.kind.as_str()),
            "Category" => Some(&self.category),
            _ => None,
        }
    }

    fn measure(&self, column: &str) -> Option<f64> {
        match column {
            "Amount" => Some(self.amount),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChurnRisk {
    High,
    Medium,
    Low,
}

impl ChurnRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnRisk::High => "High",
            ChurnRisk::Medium => "Medium",
            ChurnRisk::Low => "Low",
        }
    }
}

impl fmt::Display for ChurnRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerRecord {
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    pub customer_name: String,
    pub last_purchase_date: NaiveDate,
    pub purchase_frequency: u32,
    pub avg_order_value: f64,
    pub support_tickets: u32,
    pub engagement_score: u32,
    pub health_score: u32,
    pub churn_risk: ChurnRisk,
    #[serde(rename = "PredictedLTV")]
    pub predicted_ltv: f64,
    #[serde(
        deserialize_with = "deserialize_sentiment",
        serialize_with = "serialize_sentiment"
    )]
    pub sentiment_history: Vec<f64>,
}

impl Measurable for CustomerRecord {
    const MEASURES: &'static [&'static str] = &[
        "PurchaseFrequency",
        "AvgOrderValue",
        "SupportTickets",
        "EngagementScore",
        "HealthScore",
        "PredictedLTV",
    ];

    fn dimension(&self, column: &str) -> Option<&str> {
        match column {
            "CustomerID" => Some(&self.customer_id),
            "CustomerName" => Some(&self.customer_name),
            "ChurnRisk" => Some(self.churn_risk.as_str()),
            _ => None,
        }
    }

    fn measure(&self, column: &str) -> Option<f64> {
        match column {
            "PurchaseFrequency" => Some(f64::from(self.purchase_frequency)),
            "AvgOrderValue" => Some(self.avg_order_value),
            "SupportTickets" => Some(f64::from(self.support_tickets)),
            "EngagementScore" => Some(f64::from(self.engagement_score)),
            "HealthScore" => Some(f64::from(self.health_score)),
            "PredictedLTV" => Some(self.predicted_ltv),
            _ => None,
        }
    }
}

/// Sentiment history is stored as a bracketed list inside one CSV cell.
fn deserialize_sentiment<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let values: Vec<f64> = serde_json::from_str(raw.trim()).map_err(serde::de::Error::custom)?;
    if values.len() != SENTIMENT_MONTHS {
        return Err(serde::de::Error::custom(format!(
            "expected {SENTIMENT_MONTHS} sentiment values, found {}",
            values.len()
        )));
    }
    Ok(values)
}

fn serialize_sentiment<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = serde_json::to_string(values).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_revenue_is_quantity_times_price() {
        let record = SalesRecord {
            order_id: None,
            order_date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            customer_name: "Alpha Corp".to_string(),
            state: "NY".to_string(),
            product: None,
            category: "Wearables".to_string(),
            quantity: 3,
            price: 19.5,
            marketing_source: "Referral".to_string(),
            satisfaction_score: 5,
        };
        assert_eq!(record.total_revenue(), 58.5);
        assert_eq!(record.measure("TotalRevenue"), Some(58.5));
        assert_eq!(record.dimension("Product"), None);
    }

    #[test]
    fn customer_row_parses_sentiment_cell() {
        let data = "CustomerID,CustomerName,LastPurchaseDate,PurchaseFrequency,AvgOrderValue,SupportTickets,EngagementScore,HealthScore,ChurnRisk,PredictedLTV,SentimentHistory\n\
CUST-101,Alpha Corp,2024-05-01,4,120.5,1,77,63,Medium,1400.25,\"[0.5, 0.6, 0.7, 0.6, 0.5, 0.4, 0.5, 0.6, 0.7, 0.8, 0.7, 0.6]\"\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: CustomerRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.churn_risk, ChurnRisk::Medium);
        assert_eq!(record.sentiment_history.len(), SENTIMENT_MONTHS);
        assert_eq!(record.sentiment_history[2], 0.7);
    }

    #[test]
    fn short_sentiment_history_is_rejected() {
        let data = "CustomerID,CustomerName,LastPurchaseDate,PurchaseFrequency,AvgOrderValue,SupportTickets,EngagementScore,HealthScore,ChurnRisk,PredictedLTV,SentimentHistory\n\
CUST-101,Alpha Corp,2024-05-01,4,120.5,1,77,63,Medium,1400.25,\"[0.5, 0.6]\"\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let result: Option<Result<CustomerRecord, csv::Error>> = reader.deserialize().next();
        assert!(result.unwrap().is_err());
    }

    #[test]
    fn financial_type_column_maps_to_enum() {
        let data = "Date,Type,Category,Amount\n2023-01-01,Expense,Rent,5012.5\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: FinancialRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.kind, TransactionType::Expense);
        assert_eq!(record.dimension("Type"), Some("Expense"));
    }
}
