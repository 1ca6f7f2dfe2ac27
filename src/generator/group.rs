//! Boolean group, negation, and nested-context translation (§4.3.2/§4.3.3):
//! the dispatcher every other translation path (filters, aggregation
//! `where`, sort `where`) recurses back through.

use crate::dsl::{BooleanQuery, Query, QueryStringQuery};
use crate::error::{SelError, Warnings};
use crate::ir::{GroupOperator, Node};
use crate::resolver::{self, ResolveOptions};
use crate::schema::Schema;
use crate::GeneratorConfig;

pub(crate) fn translate_node(
    node: &Node,
    schema: &Schema,
    config: &GeneratorConfig,
    current_nested: &[String],
    warnings: &mut Warnings,
) -> Result<Query, SelError> {
    match node {
        Node::Filter { field, comparator, value, r#where } => {
            super::filter::translate_filter(field, *comparator, value, r#where, schema, config, current_nested, warnings)
        }
        Node::QueryString { query } => Ok(translate_query_string(query, config)),
        Node::Context { field, r#where } => translate_context(field, r#where, schema, config, current_nested, warnings),
        Node::Not { inner } => Ok(translate_node(inner, schema, config, current_nested, warnings)?.negate()),
        Node::Group { operator, items } => translate_group(*operator, items, schema, config, current_nested, warnings),
    }
}

fn translate_query_string(query: &str, config: &GeneratorConfig) -> Query {
    let fields = config.default_query_string_field.clone().into_iter().collect();
    QueryStringQuery::new(query, fields).into()
}

fn translate_context(
    field: &str,
    where_node: &Node,
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
            allow_functions: false,
            default_subfields: &config.default_object_subfields,
        },
    )?;
    if resolved.nested.is_empty() {
        return Err(SelError::client_input(format!(
            "'{field}' is not a nested field; `where` requires a nested context"
        )));
    }
    if resolved.nested == current_nested {
        warnings.push(format!(
            "context on '{field}' is unnecessary: already inside this nested scope"
        ));
    }
    let inner = translate_node(where_node, schema, config, &resolved.nested, warnings)?;
    Ok(super::wrap_nested(current_nested, &resolved.nested, inner))
}

/// Whether `q` is exactly `{bool: {...}}` with every other `Query` field
/// unset — used to detect a query built purely by [`Query::negate`] so a
/// `Group` can flatten it straight into its own `must_not`/`should` instead
/// of nesting a redundant `bool` wrapper inside a `bool` wrapper.
fn only_boolean_set(q: &Query) -> bool {
    let mut probe = Query::default();
    probe.boolean = q.boolean.clone();
    probe == *q
}

fn as_single_must_not(q: &Query) -> Option<Query> {
    if !only_boolean_set(q) {
        return None;
    }
    let b = q.boolean.as_ref()?;
    if b.must.is_empty() && b.should.is_empty() && b.must_not.len() == 1 && b.minimum_should_match.is_none() {
        Some(b.must_not[0].clone())
    } else {
        None
    }
}

fn translate_group(
    operator: GroupOperator,
    items: &[Node],
    schema: &Schema,
    config: &GeneratorConfig,
    current_nested: &[String],
    warnings: &mut Warnings,
) -> Result<Query, SelError> {
    if items.is_empty() {
        return Ok(Query::match_all());
    }
    if items.len() == 1 {
        return translate_node(&items[0], schema, config, current_nested, warnings);
    }

    let mut must = Vec::new();
    let mut must_not = Vec::new();
    let mut should = Vec::new();

    for item in items {
        let q = translate_node(item, schema, config, current_nested, warnings)?;
        match operator {
            GroupOperator::And => {
                if let Some(inner) = as_single_must_not(&q) {
                    must_not.push(inner);
                } else {
                    must.push(q);
                }
            }
            GroupOperator::Or => {
                if let Some(inner) = as_single_must_not(&q) {
                    should.push(inner.negate());
                } else {
                    should.push(q);
                }
            }
        }
    }

    let boolean = match operator {
        GroupOperator::And => BooleanQuery { must, must_not, ..Default::default() },
        GroupOperator::Or => BooleanQuery { should, ..Default::default() },
    };
    Ok(boolean.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Comparator, FilterValue};
    use crate::schema::{Field, FieldType};
    use std::collections::BTreeMap;

    fn demo_schema() -> Schema {
        let mut root = BTreeMap::new();
        root.insert("a".to_string(), Field::leaf(FieldType::Str));
        root.insert("b".to_string(), Field::leaf(FieldType::Str));
        Schema::new(root).unwrap()
    }

    fn filter(field: &str, comparator: Comparator, v: &str) -> Node {
        Node::Filter {
            field: field.to_string(),
            comparator,
            value: FilterValue::Scalar(v.to_string()),
            r#where: None,
        }
    }

    #[test]
    fn and_group_flattens_negated_child_into_must_not() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let node = Node::Group {
            operator: GroupOperator::And,
            items: vec![filter("a", Comparator::Eq, "1"), filter("b", Comparator::Ne, "2")],
        };
        let q = translate_node(&node, &schema, &config, &[], &mut warnings).unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["bool"]["must"].as_array().unwrap().len(), 1);
        assert_eq!(json["bool"]["must_not"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_group_is_match_all() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let node = Node::Group { operator: GroupOperator::And, items: vec![] };
        let q = translate_node(&node, &schema, &config, &[], &mut warnings).unwrap();
        assert_eq!(q, Query::match_all());
    }

    #[test]
    fn single_item_group_collapses() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let node = Node::Group { operator: GroupOperator::Or, items: vec![filter("a", Comparator::Eq, "1")] };
        let q = translate_node(&node, &schema, &config, &[], &mut warnings).unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["term"]["a"]["value"], "1");
    }

    #[test]
    fn not_on_non_nested_field_is_rejected() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let node = Node::Context {
            field: "a".to_string(),
            r#where: Box::new(filter("b", Comparator::Eq, "1")),
        };
        let err = translate_node(&node, &schema, &config, &[], &mut warnings).unwrap_err();
        assert!(matches!(err, SelError::ClientInput { .. }));
    }
}
