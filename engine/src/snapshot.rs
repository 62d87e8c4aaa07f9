//! Dashboard snapshot types and the swappable handle the serving layer
//! reads them through.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The full precomputed dashboard result of one load-and-aggregate cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardData {
    pub country_stats: Vec<CountryStat>,
    pub top_products: Vec<TopItem>,
    pub top_regions: Vec<TopItem>,
    /// Year string -> chronologically ordered monthly volumes.
    pub monthly_sales: BTreeMap<String, Vec<MonthlyPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryStat {
    pub country: String,
    pub revenue: f64,
    pub transactions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub extra: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    #[serde(rename = "sales")]
    pub volume: f64,
}

/// Swappable handle to the most recent snapshot.
///
/// Readers clone the inner `Arc` and never observe a torn value; `set`
/// replaces the snapshot without waiting for readers still holding an
/// earlier clone. `None` means no load has completed yet, which the HTTP
/// layer answers with 503.
#[derive(Default)]
pub struct SnapshotHolder {
    current: RwLock<Option<Arc<DashboardData>>>,
}

impl SnapshotHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, data: DashboardData) {
        *self.current.write() = Some(Arc::new(data));
    }

    pub fn get(&self) -> Option<Arc<DashboardData>> {
        self.current.read().clone()
    }
}
