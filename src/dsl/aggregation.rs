//! Backend [aggregation](https://www.elastic.co/guide/en/elasticsearch/reference/current/search-aggregations.html)
//! DSL: one struct-of-options sum type per bucket/metric kind, each
//! carrying its own nested `aggs` so aggregation trees recurse the same
//! way [`super::Query`] does.

use serde::{Deserialize, Serialize};

use super::nested::ReverseNested;
use super::Query;
use crate::ir::OrderedMap;

/// `terms` bucket aggregation: one bucket per distinct field value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TermsAgg {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// `histogram` bucket aggregation over a numeric field.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistogramAgg {
    pub field: String,
    pub interval: f64,
}

/// `date_histogram` bucket aggregation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DateHistogramAgg {
    pub field: String,
    pub calendar_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A single-field metric aggregation: `value_count`, `cardinality`, `avg`,
/// `sum`, `min`, `max`, and `extended_stats` all share this shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetricAgg {
    pub field: String,
    /// Only meaningful for `cardinality`: caps memory use at the cost of
    /// exact-count precision above the threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision_threshold: Option<u32>,
}

/// A `filter` bucket aggregation: subaggregations run only over documents
/// matching `filter`, used to implement a `where` clause on an aggregation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FilterAgg {
    pub filter: Box<Query>,
}

/// A `nested` bucket aggregation: enters a `nested`-typed path's own
/// document space, used to implement `under`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NestedAgg {
    pub path: String,
}

/// The aggregation sum type: exactly one of the bucket/metric fields is
/// populated, with an optional `aggs` map of named subaggregations.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AggregationQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_histogram: Option<DateHistogramAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_count: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_stats: Option<MetricAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<FilterAgg>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_nested: Option<ReverseNested>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub aggs: OrderedMap<AggregationQuery>,
}

impl AggregationQuery {
    pub fn terms(field: impl Into<String>, size: Option<u64>) -> Self {
        AggregationQuery {
            terms: Some(TermsAgg { field: field.into(), size }),
            ..Default::default()
        }
    }

    pub fn date_histogram(field: impl Into<String>, calendar_interval: impl Into<String>) -> Self {
        AggregationQuery {
            date_histogram: Some(DateHistogramAgg {
                field: field.into(),
                calendar_interval: calendar_interval.into(),
                format: None,
                time_zone: None,
            }),
            ..Default::default()
        }
    }

    pub fn metric(kind: &str, field: impl Into<String>) -> Self {
        let metric = MetricAgg { field: field.into() };
        let mut agg = AggregationQuery::default();
        match kind {
            "count" => agg.value_count = Some(metric),
            "distinct" => agg.cardinality = Some(metric),
            "average" => agg.avg = Some(metric),
            "sum" => agg.sum = Some(metric),
            "min" => agg.min = Some(metric),
            "max" => agg.max = Some(metric),
            "stats" => agg.extended_stats = Some(metric),
            other => panic!("unknown metric aggregation kind: {other}"),
        }
        agg
    }

    pub fn filtered(filter: impl Into<Query>) -> Self {
        AggregationQuery {
            filter: Some(Box::new(FilterAgg {
                filter: Box::new(filter.into()),
            })),
            ..Default::default()
        }
    }

    pub fn nested(path: impl Into<String>) -> Self {
        AggregationQuery {
            nested: Some(NestedAgg { path: path.into() }),
            ..Default::default()
        }
    }

    pub fn reverse_nested(path: Option<String>) -> Self {
        AggregationQuery {
            reverse_nested: Some(ReverseNested { path }),
            ..Default::default()
        }
    }

    pub fn with_sub(mut self, name: impl Into<String>, sub: AggregationQuery) -> Self {
        self.aggs.push(name, sub);
        self
    }
}
