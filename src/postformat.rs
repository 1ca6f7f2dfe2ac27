//! Component F: reshapes a raw backend aggregation response against the
//! [`QueryPlan`] the generator produced, attaching plan metadata to each
//! named aggregation, trimming oversized bucket lists, and rendering
//! `key_as_string` for date histograms (§4.4).

use serde::Serialize;

use crate::date;
use crate::error::Warnings;
use crate::generator::{PlanEntry, QueryPlan};
use crate::ir::{AggregationType, OrderedMap};
use crate::GeneratorConfig;

/// A single bucket, reshaped with its `key_as_string` (for date
/// histograms) and recursively formatted subaggregations.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormattedBucket {
    pub key: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub subaggreg: OrderedMap<FormattedAggregation>,
}

/// One formatted aggregation: plan metadata plus its reshaped body.
/// `buckets` is set for bucket aggregations (`aggreg`, `histogram`);
/// `value` is the pass-through raw metric response otherwise. Exactly one
/// is ever populated — they aren't merged into a single enum field because
/// a bucket *array* can't `#[serde(flatten)]` into the surrounding map.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormattedAggregation {
    pub aggregation_type: AggregationType,
    pub field: String,
    pub query_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<FormattedBucket>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Reshape a raw backend `"aggregations"` object (keyed by the same names
/// as `plan`) against the query plan, emitting warnings for any bucket
/// truncation or performance concerns encountered along the way.
pub fn format_response(
    raw: &serde_json::Value,
    plan: &QueryPlan,
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> OrderedMap<FormattedAggregation> {
    let mut out = OrderedMap::new();
    for (name, entry) in plan.iter() {
        let raw_entry = raw.get(name).cloned().unwrap_or(serde_json::Value::Null);
        out.push(name.clone(), format_one(entry, &raw_entry, config, warnings));
    }
    out
}

fn format_one(
    entry: &PlanEntry,
    raw: &serde_json::Value,
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> FormattedAggregation {
    let (buckets, value) = match raw.get("buckets").and_then(|b| b.as_array()) {
        Some(buckets) => (Some(format_buckets(entry, buckets, config, warnings)), None),
        None => (None, Some(raw.clone())),
    };

    FormattedAggregation {
        aggregation_type: entry.aggregation_type,
        field: entry.field.clone(),
        query_field: entry.query_field.clone(),
        interval: entry.interval.clone(),
        graph: entry.graph.clone(),
        buckets,
        value,
    }
}

fn format_buckets(
    entry: &PlanEntry,
    buckets: &[serde_json::Value],
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> Vec<FormattedBucket> {
    let configured_size = entry.size.unwrap_or(config.aggregation_default_size);

    let mut trimmed = buckets;
    if configured_size > 0 && buckets.len() as u64 > configured_size {
        trimmed = &buckets[..configured_size as usize];
        warnings.push(format!(
            "aggregation on '{}' returned more buckets than requested; truncated to {configured_size}",
            entry.query_field
        ));
    }

    if entry.aggregation_type != AggregationType::Histogram && trimmed.len() > 10_000 {
        warnings.push(format!(
            "aggregation on '{}' returned {} buckets; this may be slow to process",
            entry.query_field,
            trimmed.len()
        ));
    }

    let interval = entry
        .interval
        .as_deref()
        .or(Some(config.aggregation_default_date_interval.as_str()))
        .and_then(|raw| date::Interval::parse(raw).ok());

    let mut out = Vec::with_capacity(trimmed.len());
    for bucket in trimmed {
        out.push(format_bucket(entry, bucket, interval, config, warnings));
    }
    out
}

fn format_bucket(
    entry: &PlanEntry,
    bucket: &serde_json::Value,
    interval: Option<date::Interval>,
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> FormattedBucket {
    let key = bucket.get("key").cloned().unwrap_or(serde_json::Value::Null);
    let doc_count = bucket.get("doc_count").and_then(|v| v.as_u64()).unwrap_or(0);

    let key_as_string = bucket
        .get("key_as_string")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| {
            if entry.aggregation_type == AggregationType::Histogram {
                interval.zip(key.as_i64()).map(|(iv, millis)| iv.format_bucket_key(millis))
            } else {
                None
            }
        });

    let mut subaggreg = OrderedMap::new();
    for (sub_name, sub_entry) in entry.subaggreg.iter() {
        if let Some(sub_raw) = bucket.get(sub_name) {
            subaggreg.push(sub_name.clone(), format_one(sub_entry, sub_raw, config, warnings));
        }
    }

    FormattedBucket { key, key_as_string, doc_count, subaggreg }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::OrderedMap as Map;
    use serde_json::json;

    fn entry(aggregation_type: AggregationType, size: Option<u64>) -> PlanEntry {
        PlanEntry {
            aggregation_type,
            field: "color".to_string(),
            query_field: "color".to_string(),
            size,
            interval: None,
            graph: None,
            subaggreg: Map::new(),
        }
    }

    #[test]
    fn truncates_overflowing_buckets_and_warns() {
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let mut plan = Map::new();
        plan.push("by_color", entry(AggregationType::Aggreg, Some(2)));
        let raw = json!({
            "by_color": { "buckets": [
                {"key": "red", "doc_count": 3},
                {"key": "blue", "doc_count": 2},
                {"key": "green", "doc_count": 1},
            ]}
        });
        let out = format_response(&raw, &plan, &config, &mut warnings);
        let agg = &out.iter().find(|(k, _)| k == "by_color").unwrap().1;
        assert_eq!(agg.buckets.as_ref().unwrap().len(), 2);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn date_histogram_bucket_gets_key_as_string_from_interval() {
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let mut plan = Map::new();
        let mut date_entry = entry(AggregationType::Histogram, None);
        date_entry.interval = Some("day".to_string());
        plan.push("by_day", date_entry);
        let raw = json!({
            "by_day": { "buckets": [
                {"key": 1_000_000_000_000i64, "doc_count": 5},
            ]}
        });
        let out = format_response(&raw, &plan, &config, &mut warnings);
        let agg = &out.iter().next().unwrap().1;
        assert!(agg.buckets.as_ref().unwrap()[0].key_as_string.is_some());
    }

    #[test]
    fn metric_aggregation_passes_raw_value_through() {
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let mut plan = Map::new();
        plan.push("avg_score", entry(AggregationType::Average, None));
        let raw = json!({ "avg_score": { "value": 4.5 } });
        let out = format_response(&raw, &plan, &config, &mut warnings);
        let agg = &out.iter().next().unwrap().1;
        assert_eq!(agg.value.as_ref().unwrap()["value"], 4.5);
    }
}
