use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{aggregate, AggregateRow, GroupKey};
use crate::error::EngineError;
use crate::metrics::{ad_metric_definitions, AdMetrics, CONVERSION_RATE, CTR, ROAS};
use crate::models::AdRecord;
use crate::normalize::NormalizedTable;
use crate::scoring::{rank, GradedRow, WeightVector};

pub const TOP_CREATIVES: usize = 10;

/// Aggregate per platform, normalize the four ad metrics (CPC inverted) and
/// grade with `weights`, best first.
pub fn rank_platforms(records: &[AdRecord], weights: &WeightVector) -> Vec<GradedRow> {
    let definitions = ad_metric_definitions();
    let rows = aggregate(records, &GroupKey::new("Platform"), &definitions);
    let table = NormalizedTable::build(&rows, &definitions);
    let ranked = rank(rows, &table, weights);
    debug!(platforms = ranked.len(), "ranked platforms");
    ranked
}

/// KPIs creatives can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreativeKpi {
    Roas,
    Ctr,
    ConversionRate,
}

impl CreativeKpi {
    pub fn metric_name(&self) -> &'static str {
        match self {
            CreativeKpi::Roas => ROAS,
            CreativeKpi::Ctr => CTR,
            CreativeKpi::ConversionRate => CONVERSION_RATE,
        }
    }
}

impl FromStr for CreativeKpi {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "roas" => Ok(CreativeKpi::Roas),
            "ctr" => Ok(CreativeKpi::Ctr),
            "conversionrate" | "conversion-rate" | "conversion_rate" => Ok(CreativeKpi::ConversionRate),
            other => Err(EngineError::InvalidParameter {
                name: "kpi".to_string(),
                reason: format!("unknown creative KPI {other:?}"),
            }),
        }
    }
}

/// Top creatives of one platform by `kpi`, highest first.
pub fn top_creatives(records: &[AdRecord], platform: &str, kpi: CreativeKpi) -> Vec<AggregateRow> {
    let on_platform: Vec<AdRecord> = records
        .iter()
        .filter(|record| record.platform == platform)
        .cloned()
        .collect();
    let key = GroupKey::composite(&["CreativeName", "CreativeType"]);
    let mut rows = aggregate(&on_platform, &key, &ad_metric_definitions());

    let metric = kpi.metric_name();
    rows.sort_by(|a, b| {
        b.metric(metric)
            .partial_cmp(&a.metric(metric))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(TOP_CREATIVES);
    rows
}

/// A single ad row with its own ratios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub record: AdRecord,
    pub metrics: AdMetrics,
}

/// Best individual rows of one platform by `kpi`, highest first.
pub fn top_placements(records: &[AdRecord], platform: &str, kpi: CreativeKpi) -> Vec<Placement> {
    let metric = kpi.metric_name();
    let mut placements: Vec<Placement> = records
        .iter()
        .filter(|record| record.platform == platform)
        .map(|record| Placement {
            record: record.clone(),
            metrics: AdMetrics::from_record(record),
        })
        .collect();
    placements.sort_by(|a, b| {
        let a = a.metrics.get(metric).unwrap_or_default();
        let b = b.metrics.get(metric).unwrap_or_default();
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    placements.truncate(TOP_CREATIVES);
    placements
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdDashboard {
    pub weights: WeightVector,
    pub platforms: Vec<GradedRow>,
    pub creative_platform: Option<String>,
    pub creative_kpi: CreativeKpi,
    pub creatives: Vec<AggregateRow>,
    pub placements: Vec<Placement>,
}

/// Rank platforms and analyse creatives. Without an explicit platform the
/// top-graded one is analysed.
pub fn build_dashboard(
    records: &[AdRecord],
    weights: &WeightVector,
    platform: Option<&str>,
    kpi: CreativeKpi,
) -> AdDashboard {
    let platforms = rank_platforms(records, weights);
    let creative_platform = platform
        .map(str::to_string)
        .or_else(|| platforms.first().map(|graded| graded.row.label()));
    let creatives = creative_platform
        .as_deref()
        .map(|name| top_creatives(records, name, kpi))
        .unwrap_or_default();
    let placements = creative_platform
        .as_deref()
        .map(|name| top_placements(records, name, kpi))
        .unwrap_or_default();

    AdDashboard {
        weights: weights.clone(),
        platforms,
        creative_platform,
        creative_kpi: kpi,
        creatives,
        placements,
    }
}
