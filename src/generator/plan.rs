//! The query plan: a tree mirroring the aggregation structure the
//! generator built, consumed by the post-formatter (component F) to attach
//! bucket metadata the raw backend response can't carry on its own.

use serde::{Deserialize, Serialize};

use crate::ir::{AggregationType, OrderedMap};

/// One aggregation's worth of plan metadata, keyed by aggregation name in
/// the enclosing [`QueryPlan`]/`subaggreg` map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanEntry {
    pub aggregation_type: AggregationType,
    /// Canonical (resolved) field path.
    pub field: String,
    /// The field path exactly as the caller wrote it.
    pub query_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub subaggreg: OrderedMap<PlanEntry>,
}

pub type QueryPlan = OrderedMap<PlanEntry>;
