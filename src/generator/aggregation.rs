//! Aggregation translation (§4.3.4): resolves an [`Aggregation`] node's
//! field, coerces its type against the schema, wraps it for nested scope
//! (`under`), applies its `where` filter, and recurses into `subaggreg`.

use crate::date;
use crate::dsl::AggregationQuery;
use crate::error::{SelError, Warnings};
use crate::ir::{Aggregation, AggregationType};
use crate::resolver::{self, ResolveOptions, ResolvedField};
use crate::schema::{self, Schema};
use crate::GeneratorConfig;

use super::plan::PlanEntry;

pub(crate) fn translate_aggregation(
    agg: &Aggregation,
    schema: &Schema,
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> Result<(AggregationQuery, PlanEntry), SelError> {
    let resolved = resolver::resolve(
        schema,
        &agg.field,
        ResolveOptions {
            current_nested: &[],
            allow_functions: false,
            default_subfields: &config.default_object_subfields,
        },
    )?;

    let mut effective_type = agg.aggregation_type;
    if effective_type == AggregationType::Aggreg && resolved.field_type.is_date() {
        effective_type = AggregationType::Histogram;
    }

    let field_path = resolved.path_string();
    let mut body = build_body(effective_type, agg, &resolved, &field_path, config)?;

    let mut plan_sub = crate::ir::OrderedMap::new();
    for (sub_name, sub_agg) in agg.subaggreg.iter() {
        let (sub_body, sub_plan) = translate_aggregation(sub_agg, schema, config, warnings)?;
        body = body.with_sub(sub_name.clone(), sub_body);
        plan_sub.push(sub_name.clone(), sub_plan);
    }

    let under_nested = match &agg.under {
        Some(under_field) => {
            let under_resolved = resolver::resolve(
                schema,
                under_field,
                ResolveOptions {
                    current_nested: &[],
                    allow_functions: false,
                    default_subfields: &config.default_object_subfields,
                },
            )?;
            if !(under_resolved.nested == resolved.nested || is_ancestor_of(&under_resolved.nested, &resolved.nested)) {
                return Err(SelError::client_input(format!(
                    "'under {under_field}' is incompatible with '{}': not an ancestor nested scope",
                    agg.field
                )));
            }
            Some(under_resolved.nested)
        }
        None => None,
    };

    let scope_target = under_nested.clone().unwrap_or_else(|| resolved.nested.clone());
    body = wrap_for_scope(body, &resolved.nested, &scope_target);

    if let Some(where_node) = &agg.r#where {
        let filter_query = super::group::translate_node(where_node, schema, config, &scope_target, warnings)?;
        body = AggregationQuery::filtered(filter_query).with_sub("filtered", body);
    }

    let plan = PlanEntry {
        aggregation_type: effective_type,
        field: field_path,
        query_field: agg.field.clone(),
        size: agg.size,
        interval: agg.interval.clone(),
        graph: agg.graph.clone(),
        subaggreg: plan_sub,
    };

    Ok((body, plan))
}

fn build_body(
    effective_type: AggregationType,
    agg: &Aggregation,
    resolved: &ResolvedField,
    field_path: &str,
    config: &GeneratorConfig,
) -> Result<AggregationQuery, SelError> {
    match effective_type {
        AggregationType::Aggreg => {
            let size = agg.size.unwrap_or(config.aggregation_default_size);
            let dsl_size = if size > 0 { Some(size + 1) } else { None };
            Ok(AggregationQuery::terms(field_path, dsl_size))
        }
        AggregationType::Histogram if resolved.field_type.is_date() => {
            let interval_raw = agg.interval.as_deref().unwrap_or(&config.aggregation_default_date_interval);
            let interval = date::Interval::parse(interval_raw)?;
            let mut dh = AggregationQuery::date_histogram(field_path, interval.calendar_interval());
            if let Some(date_histogram) = dh.date_histogram.as_mut() {
                date_histogram.format = Some("yyyy-MM-dd".to_string());
                date_histogram.time_zone = Some(config.time_zone.clone());
            }
            Ok(dh)
        }
        AggregationType::Histogram => {
            let interval_raw = agg.interval.as_deref().ok_or_else(|| {
                SelError::client_input(format!("aggregation on '{}' requires an 'interval' parameter", agg.field))
            })?;
            let interval: f64 = interval_raw
                .parse()
                .map_err(|_| SelError::client_input(format!("'{interval_raw}' is not a valid numeric interval")))?;
            Ok(AggregationQuery {
                histogram: Some(crate::dsl::HistogramAgg { field: field_path.to_string(), interval }),
                ..Default::default()
            })
        }
        AggregationType::Count => Ok(AggregationQuery::metric("count", field_path)),
        AggregationType::Distinct => {
            let mut metric = AggregationQuery::metric("distinct", field_path);
            if let Some(cardinality) = metric.cardinality.as_mut() {
                cardinality.precision_threshold = Some(40_000);
            }
            Ok(metric)
        }
        AggregationType::Min => {
            require_numeric_or_date(resolved, &agg.field)?;
            Ok(AggregationQuery::metric("min", field_path))
        }
        AggregationType::Max => {
            require_numeric_or_date(resolved, &agg.field)?;
            Ok(AggregationQuery::metric("max", field_path))
        }
        AggregationType::Sum => {
            require_numeric(resolved, &agg.field)?;
            Ok(AggregationQuery::metric("sum", field_path))
        }
        AggregationType::Average => {
            require_numeric(resolved, &agg.field)?;
            Ok(AggregationQuery::metric("average", field_path))
        }
        AggregationType::Stats => {
            require_numeric(resolved, &agg.field)?;
            Ok(AggregationQuery::metric("stats", field_path))
        }
    }
}

fn require_numeric(resolved: &ResolvedField, field: &str) -> Result<(), SelError> {
    if resolved.field_type.is_numeric() {
        Ok(())
    } else {
        Err(SelError::client_input(format!(
            "aggregation on '{field}' requires a numeric field"
        )))
    }
}

fn require_numeric_or_date(resolved: &ResolvedField, field: &str) -> Result<(), SelError> {
    if resolved.field_type.is_numeric() || resolved.field_type.is_date() {
        Ok(())
    } else {
        Err(SelError::client_input(format!(
            "aggregation on '{field}' requires a numeric or date field"
        )))
    }
}

fn is_ancestor_of(ancestor: &[String], descendant: &[String]) -> bool {
    descendant.len() >= ancestor.len() && descendant[..ancestor.len()] == *ancestor
}

/// Wrap an aggregation body for the nested scope it was built in
/// (`from_nested`), then, if `to_nested` (from an `under` clause) isn't an
/// ancestor of that scope, escape back out with `reverse_nested`.
fn wrap_for_scope(body: AggregationQuery, from_nested: &[String], to_nested: &[String]) -> AggregationQuery {
    let primary = if from_nested.is_empty() {
        body
    } else {
        AggregationQuery::nested(schema::path_to_string(from_nested)).with_sub("agg", body)
    };

    if to_nested == from_nested || is_ancestor_of(to_nested, from_nested) {
        return primary;
    }

    let path_opt = if to_nested.is_empty() { None } else { Some(schema::path_to_string(to_nested)) };
    AggregationQuery::reverse_nested(path_opt).with_sub("agg", primary)
}
