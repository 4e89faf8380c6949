//! Metrics and scoring engine behind the sales, customer, financial and ad
//! performance dashboards.

pub mod ads;
pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod customers;
pub mod error;
pub mod finance;
pub mod generate;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod report;
pub mod sales;
pub mod schema;
pub mod scoring;

pub use error::{EngineError, EngineResult};
