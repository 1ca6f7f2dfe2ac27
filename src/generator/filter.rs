//! Filter-leaf translation (§4.3.1): turns a single [`Node::Filter`] into a
//! backend [`Query`], handling comparator dispatch, type coercion, date
//! arithmetic, nested wrapping, and `where` attachment.

use std::collections::BTreeMap;

use crate::date;
use crate::dsl::{BooleanQuery, PrefixQuery, Query, QueryStringQuery, RangeQuery, TermQuery, TermsQuery};
use crate::error::{SelError, Warnings};
use crate::ir::{Comparator, FilterValue, Node};
use crate::resolver::{self, PseudoFunction, ResolveOptions, ResolvedField};
use crate::schema::Schema;
use crate::GeneratorConfig;

pub(crate) fn translate_filter(
    field: &str,
    comparator: Comparator,
    value: &FilterValue,
    where_: &Option<Box<Node>>,
    schema: &Schema,
    config: &GeneratorConfig,
    current_nested: &[String],
    warnings: &mut Warnings,
) -> Result<Query, SelError> {
    let resolved = resolver::resolve(
        schema,
        field,
        ResolveOptions {
            current_nested,
            allow_functions: true,
            default_subfields: &config.default_object_subfields,
        },
    )?;

    let inner = build_leaf_query(&resolved, comparator.positive_form(), value, config)?;

    let mut result = if let Some(where_node) = where_ {
        let effective_nested = if !resolved.nested.is_empty() {
            resolved.nested.clone()
        } else if !current_nested.is_empty() {
            warnings.push(format!(
                "`where` on '{field}' is not necessary: the field is not nested"
            ));
            current_nested.to_vec()
        } else {
            return Err(SelError::client_input(format!(
                "`where` on '{field}' requires a nested field"
            )));
        };
        let where_query = super::group::translate_node(where_node, schema, config, &effective_nested, warnings)?;
        let combined: Query = BooleanQuery {
            must: vec![inner, where_query],
            ..Default::default()
        }
        .into();
        super::wrap_nested(current_nested, &effective_nested, combined)
    } else {
        super::wrap_nested(current_nested, &resolved.nested, inner)
    };

    if comparator.is_negative() {
        result = result.negate();
    }

    Ok(result)
}

fn build_leaf_query(
    resolved: &ResolvedField,
    comparator: Comparator,
    value: &FilterValue,
    config: &GeneratorConfig,
) -> Result<Query, SelError> {
    if resolved.function != PseudoFunction::None {
        if comparator != Comparator::Eq {
            return Err(SelError::client_input(format!(
                "'{}': may only use comparator = or !=",
                resolved.query_field
            )));
        }
        let value = normalize_boolean(scalar(value)?, &resolved.query_field)? == "true";
        let exists: Query = crate::dsl::ExistsQuery::new(resolved.path_string()).into();
        let base = match resolved.function {
            PseudoFunction::Exists => exists,
            PseudoFunction::Missing => exists.negate(),
            PseudoFunction::None => unreachable!(),
        };
        return Ok(if value { base } else { base.negate() });
    }

    match comparator {
        Comparator::Eq => build_equality(resolved, scalar(value)?, config),
        Comparator::Match => Ok(QueryStringQuery::new(scalar(value)?, vec![resolved.path_string()]).into()),
        Comparator::Lt | Comparator::Lte | Comparator::Gt | Comparator::Gte => {
            build_numeric_or_date_comparison(resolved, comparator, scalar(value)?, config)
        }
        Comparator::In => build_in(resolved, list(value)?),
        Comparator::Range => build_range_filter(resolved, map(value)?, config),
        Comparator::Prefix => Ok(PrefixQuery::new(resolved.path_string(), scalar(value)?).into()),
        other => Err(SelError::internal(format!(
            "comparator {other:?} is only valid in its positive form"
        ))),
    }
}

fn build_equality(resolved: &ResolvedField, raw: &str, config: &GeneratorConfig) -> Result<Query, SelError> {
    if resolved.field_type.is_boolean() {
        let normalized = normalize_boolean(raw, &resolved.query_field)?;
        return Ok(TermQuery::new(resolved.path_string(), normalized).into());
    }
    if resolved.field_type.is_date() {
        let parsed = date::parse(raw)?;
        let range = date::expand_comparator("=", parsed)?;
        return Ok(build_date_range(resolved, range, config));
    }
    Ok(TermQuery::new(resolved.path_string(), raw).into())
}

fn build_numeric_or_date_comparison(
    resolved: &ResolvedField,
    comparator: Comparator,
    raw: &str,
    config: &GeneratorConfig,
) -> Result<Query, SelError> {
    if resolved.field_type.is_date() {
        let parsed = date::parse(raw)?;
        let range = date::expand_comparator(comparator.as_str(), parsed)?;
        return Ok(build_date_range(resolved, range, config));
    }
    if !resolved.field_type.is_numeric() {
        return Err(SelError::client_input(format!(
            "comparator '{}' requires a numeric or date field, but '{}' is not",
            comparator.as_str(),
            resolved.query_field
        )));
    }
    let mut q = RangeQuery::new(resolved.path_string());
    match comparator {
        Comparator::Lt => q.lt = Some(raw.to_string()),
        Comparator::Lte => q.lte = Some(raw.to_string()),
        Comparator::Gt => q.gt = Some(raw.to_string()),
        Comparator::Gte => q.gte = Some(raw.to_string()),
        _ => unreachable!(),
    }
    Ok(q.into())
}

fn build_in(resolved: &ResolvedField, values: &[String]) -> Result<Query, SelError> {
    if resolved.field_type.is_boolean() {
        let normalized: Result<Vec<String>, SelError> = values
            .iter()
            .map(|v| normalize_boolean(v, &resolved.query_field).map(|s| s.to_string()))
            .collect();
        return Ok(TermsQuery::new(resolved.path_string(), normalized?).into());
    }
    if resolved.field_type.is_date() {
        let normalized: Result<Vec<String>, SelError> =
            values.iter().map(|v| date::parse(v).map(|p| p.format())).collect();
        return Ok(TermsQuery::new(resolved.path_string(), normalized?).into());
    }
    Ok(TermsQuery::new(resolved.path_string(), values.to_vec()).into())
}

fn build_range_filter(
    resolved: &ResolvedField,
    bounds: &BTreeMap<String, String>,
    config: &GeneratorConfig,
) -> Result<Query, SelError> {
    let mut q = RangeQuery::new(resolved.path_string());
    let is_date = resolved.field_type.is_date();
    for (symbol, raw) in bounds {
        if is_date {
            let parsed = date::parse(raw)?;
            let range = date::expand_comparator(symbol, parsed)?;
            if let Some(gte) = range.gte {
                q.gte = Some(gte);
            }
            if let Some(lt) = range.lt {
                q.lt = Some(lt);
            }
        } else if resolved.field_type.is_numeric() {
            match symbol.as_str() {
                ">" => q.gt = Some(raw.clone()),
                ">=" => q.gte = Some(raw.clone()),
                "<" => q.lt = Some(raw.clone()),
                "<=" => q.lte = Some(raw.clone()),
                other => {
                    return Err(SelError::client_input(format!(
                        "'{other}' is not a valid range comparator"
                    )))
                }
            }
        } else {
            return Err(SelError::client_input(format!(
                "range filter on '{}' requires a numeric or date field",
                resolved.query_field
            )));
        }
    }
    if is_date {
        q.format = Some(date::ELASTIC_DATE_FORMAT.to_string());
        q.time_zone = Some(config.time_zone.clone());
    }
    Ok(q.into())
}

fn build_date_range(resolved: &ResolvedField, range: date::DateRange, config: &GeneratorConfig) -> Query {
    let mut q = RangeQuery::new(resolved.path_string());
    q.gte = range.gte;
    q.lt = range.lt;
    q.format = Some(date::ELASTIC_DATE_FORMAT.to_string());
    q.time_zone = Some(config.time_zone.clone());
    q.into()
}

fn normalize_boolean(raw: &str, field: &str) -> Result<&'static str, SelError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok("true"),
        "false" | "0" | "no" => Ok("false"),
        _ => Err(SelError::client_input(format!(
            "'{raw}' is not a valid boolean value for '{field}'"
        ))),
    }
}

fn scalar(value: &FilterValue) -> Result<&str, SelError> {
    match value {
        FilterValue::Scalar(s) => Ok(s),
        _ => Err(SelError::internal("expected a scalar filter value")),
    }
}

fn list(value: &FilterValue) -> Result<&[String], SelError> {
    match value {
        FilterValue::List(v) => Ok(v),
        _ => Err(SelError::internal("expected a list filter value")),
    }
}

fn map(value: &FilterValue) -> Result<&BTreeMap<String, String>, SelError> {
    match value {
        FilterValue::Range(m) => Ok(m),
        _ => Err(SelError::internal("expected a range filter value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Comparator;
    use crate::schema::{Field, FieldType};
    use std::collections::BTreeMap as Map;

    fn demo_schema() -> Schema {
        let mut label_fields = Map::new();
        label_fields.insert("name".to_string(), Field::leaf(FieldType::Str));
        label_fields.insert("score".to_string(), Field::leaf(FieldType::Float));

        let mut media_fields = Map::new();
        media_fields.insert("label".to_string(), Field::nested(label_fields));

        let mut root = Map::new();
        root.insert("deleted".to_string(), Field::leaf(FieldType::Boolean));
        root.insert("date".to_string(), Field::leaf(FieldType::Date));
        root.insert("media".to_string(), Field::object(media_fields));

        Schema::new(root).unwrap()
    }

    #[test]
    fn equality_on_string_field_produces_term() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let q = translate_filter(
            "media.label.name",
            Comparator::Eq,
            &FilterValue::Scalar("bag".to_string()),
            &None,
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["nested"]["path"], "media.label");
        assert_eq!(json["nested"]["query"]["term"]["media.label.name"]["value"], "bag");
    }

    #[test]
    fn date_equality_expands_to_closed_open_range() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let q = translate_filter(
            "date",
            Comparator::Eq,
            &FilterValue::Scalar("2017".to_string()),
            &None,
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["range"]["date"]["gte"], "2017");
        assert_eq!(json["range"]["date"]["lt"], "2018");
    }

    #[test]
    fn not_equal_wraps_in_must_not() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let q = translate_filter(
            "deleted",
            Comparator::Ne,
            &FilterValue::Scalar("true".to_string()),
            &None,
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert!(json["bool"]["must_not"][0]["term"]["deleted"].is_object());
    }

    #[test]
    fn exists_false_wraps_in_must_not() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let q = translate_filter(
            "media.label.name.exists",
            Comparator::Eq,
            &FilterValue::Scalar("false".to_string()),
            &None,
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert!(json["nested"]["query"]["bool"]["must_not"][0]["exists"].is_object());
    }

    #[test]
    fn missing_false_is_a_plain_exists_query() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let q = translate_filter(
            "media.label.name.missing",
            Comparator::Eq,
            &FilterValue::Scalar("false".to_string()),
            &None,
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert!(json["nested"]["query"]["exists"].is_object());
    }

    #[test]
    fn exists_rejects_non_equality_comparator() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let err = translate_filter(
            "media.label.name.exists",
            Comparator::Gt,
            &FilterValue::Scalar("true".to_string()),
            &None,
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap_err();
        assert!(matches!(err, SelError::ClientInput { .. }));
    }

    #[test]
    fn where_on_non_nested_field_without_scope_is_rejected() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let where_node = Box::new(Node::Filter {
            field: "deleted".to_string(),
            comparator: Comparator::Eq,
            value: FilterValue::Scalar("false".to_string()),
            r#where: None,
        });
        let err = translate_filter(
            "deleted",
            Comparator::Eq,
            &FilterValue::Scalar("false".to_string()),
            &Some(where_node),
            &schema,
            &config,
            &[],
            &mut warnings,
        )
        .unwrap_err();
        assert!(matches!(err, SelError::ClientInput { .. }));
    }
}
