//! Component G: translates a parsed [`crate::ir::Query`] into the backend
//! query/aggregation/sort DSL (§4.3), given a [`Schema`] and
//! [`GeneratorConfig`].

mod aggregation;
mod filter;
mod group;
mod plan;
mod sort;

pub use plan::{PlanEntry, QueryPlan};

use crate::dsl::{FunctionScoreQuery, NestedQuery, Query, SortQuery};
use crate::error::{SelError, Warning, Warnings};
use crate::ir::{self, Node};
use crate::schema::{self, Schema};
use crate::GeneratorConfig;

/// The full output of [`generate`]: the backend query, its aggregations
/// keyed by name, the emitted sort clauses, and the query plan the
/// post-formatter needs to interpret aggregation buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: Query,
    pub aggregations: ir::OrderedMap<crate::dsl::AggregationQuery>,
    pub sort: Vec<SortQuery>,
    pub plan: QueryPlan,
}

/// Wrap `inner` in `{nested: {path, query}}` when moving from
/// `current_nested` out to `target_nested`; a no-op when the scopes match.
pub(crate) fn wrap_nested(current_nested: &[String], target_nested: &[String], inner: Query) -> Query {
    if target_nested == current_nested {
        inner
    } else {
        NestedQuery::new(schema::path_to_string(target_nested), inner).into()
    }
}

/// Translate an IR query into the backend DSL, returning the compiled query
/// alongside any warnings accumulated along the way.
pub fn generate(
    query: &ir::Query,
    schema: &Schema,
    config: &GeneratorConfig,
) -> Result<(CompiledQuery, Vec<Warning>), SelError> {
    let mut warnings = Warnings::new();

    let top_node = inject_not_deleted(query.query.clone(), schema, config);

    let translated = match &top_node {
        Some(node) => group::translate_node(node, schema, config, &[], &mut warnings)?,
        None => Query::match_all(),
    };

    let mut aggregations = ir::OrderedMap::new();
    let mut plan = ir::OrderedMap::new();
    for (name, agg) in query.aggregations.iter() {
        let (body, entry) = aggregation::translate_aggregation(agg, schema, config, &mut warnings)?;
        aggregations.push(name.clone(), body);
        plan.push(name.clone(), entry);
    }

    let translated_sorts = sort::translate_sorts(&query.sort, schema, config, &mut warnings)?;
    let mut sort_entries = translated_sorts.entries;
    if sort_entries.is_empty() && translated_sorts.auto_sort && translated_sorts.random_seed.is_none() {
        if let Some(node) = &top_node {
            sort_entries = sort::synthesize_auto_sorts(node, schema, config)?;
        }
    }

    let final_query = match translated_sorts.random_seed {
        Some(seed) => FunctionScoreQuery::random(translated, Some(seed)).into(),
        None => translated,
    };

    let compiled = CompiledQuery {
        query: final_query,
        aggregations,
        sort: sort_entries,
        plan,
    };

    Ok((compiled, warnings.into_deduped()))
}

/// §4.3.6: when enabled and no existing filter mentions a top-level
/// `deleted` field, AND in `{deleted != true}`.
fn inject_not_deleted(top: Option<Node>, schema: &Schema, config: &GeneratorConfig) -> Option<Node> {
    if !config.exclude_deleted_documents {
        return top;
    }
    if !schema.entries().iter().any(|e| e.path == ["deleted".to_string()]) {
        return top;
    }
    if let Some(node) = &top {
        if mentions_deleted(node) {
            return top;
        }
    }

    let not_deleted = Node::Filter {
        field: "deleted".to_string(),
        comparator: ir::Comparator::Ne,
        value: ir::FilterValue::Scalar("true".to_string()),
        r#where: None,
    };

    match top {
        Some(node) => Some(Node::Group { operator: ir::GroupOperator::And, items: vec![node, not_deleted] }),
        None => Some(not_deleted),
    }
}

fn mentions_deleted(node: &Node) -> bool {
    match node {
        Node::Filter { field, .. } => field.trim_start_matches('.') == "deleted",
        Node::Not { inner } => mentions_deleted(inner),
        Node::Group { items, .. } => items.iter().any(mentions_deleted),
        Node::Context { .. } | Node::QueryString { .. } => false,
    }
}

/// Top-level `Compiler`: bundles a [`Schema`] and [`GeneratorConfig`] so
/// repeated calls don't need to pass both explicitly.
pub struct Compiler {
    schema: Schema,
    config: GeneratorConfig,
}

impl Compiler {
    pub fn new(schema: Schema, config: GeneratorConfig) -> Self {
        Compiler { schema, config }
    }

    pub fn compile(&self, query: &ir::Query) -> Result<(CompiledQuery, Vec<Warning>), SelError> {
        generate(query, &self.schema, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Comparator, FilterValue};
    use crate::schema::{Field, FieldType};
    use std::collections::BTreeMap;

    fn demo_schema() -> Schema {
        let mut label_fields = BTreeMap::new();
        label_fields.insert("name".to_string(), Field::leaf(FieldType::Str));
        label_fields.insert("score".to_string(), Field::leaf(FieldType::Float));

        let mut media_fields = BTreeMap::new();
        media_fields.insert("label".to_string(), Field::nested(label_fields));

        let mut root = BTreeMap::new();
        root.insert("deleted".to_string(), Field::leaf(FieldType::Boolean));
        root.insert("media".to_string(), Field::object(media_fields));

        Schema::new(root).unwrap()
    }

    fn filter_node(field: &str) -> Node {
        Node::Filter {
            field: field.to_string(),
            comparator: Comparator::Eq,
            value: FilterValue::Scalar("bag".to_string()),
            r#where: None,
        }
    }

    #[test]
    fn injects_not_deleted_filter_when_absent() {
        let schema = demo_schema();
        let mut config = GeneratorConfig::default();
        config.exclude_deleted_documents = true;
        let query = ir::Query {
            query: Some(filter_node("media.label.name")),
            aggregations: ir::OrderedMap::new(),
            sort: vec![],
        };
        let (compiled, _) = generate(&query, &schema, &config).unwrap();
        let json = serde_json::to_value(&compiled.query).unwrap();
        assert!(json["bool"]["must_not"][0]["term"]["deleted"].is_object());
    }

    #[test]
    fn skips_injection_when_already_mentioned() {
        let schema = demo_schema();
        let mut config = GeneratorConfig::default();
        config.exclude_deleted_documents = true;
        let query = ir::Query {
            query: Some(Node::Filter {
                field: "deleted".to_string(),
                comparator: Comparator::Eq,
                value: FilterValue::Scalar("true".to_string()),
                r#where: None,
            }),
            aggregations: ir::OrderedMap::new(),
            sort: vec![],
        };
        let (compiled, _) = generate(&query, &schema, &config).unwrap();
        let json = serde_json::to_value(&compiled.query).unwrap();
        assert_eq!(json["term"]["deleted"]["value"], "true");
    }

    #[test]
    fn random_sort_wraps_in_function_score() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let query = ir::Query {
            query: Some(filter_node("media.label.name")),
            aggregations: ir::OrderedMap::new(),
            sort: vec![ir::Sort {
                field: "random".to_string(),
                order: None,
                mode: None,
                under: None,
                r#where: None,
                seed: Some(7),
                auto_sort: false,
            }],
        };
        let (compiled, _) = generate(&query, &schema, &config).unwrap();
        let json = serde_json::to_value(&compiled.query).unwrap();
        assert_eq!(json["function_score"]["functions"][0]["random_score"]["seed"], 7);
    }

    #[test]
    fn aggregations_and_plan_stay_in_sync() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut aggs = ir::OrderedMap::new();
        aggs.push(
            "by_label",
            ir::Aggregation {
                aggregation_type: ir::AggregationType::Aggreg,
                field: "media.label.name".to_string(),
                name: None,
                size: None,
                interval: None,
                under: None,
                r#where: None,
                graph: None,
                subaggreg: ir::OrderedMap::new(),
            },
        );
        let query = ir::Query { query: None, aggregations: aggs, sort: vec![] };
        let (compiled, _) = generate(&query, &schema, &config).unwrap();
        assert!(compiled.aggregations.contains_key("by_label"));
        assert!(compiled.plan.contains_key("by_label"));
    }

    /// End-to-end scenarios against the §8 schema: top-level `deleted:boolean`,
    /// `date:date`, nested `media.label{name, color, score}`.
    mod end_to_end {
        use super::*;
        use crate::parser;

        fn schema() -> Schema {
            let mut label_fields = BTreeMap::new();
            label_fields.insert("name".to_string(), Field::leaf(FieldType::Str));
            label_fields.insert("color".to_string(), Field::leaf(FieldType::Str));
            label_fields.insert("score".to_string(), Field::leaf(FieldType::Float));

            let mut media_fields = BTreeMap::new();
            media_fields.insert("label".to_string(), Field::nested(label_fields));

            let mut root = BTreeMap::new();
            root.insert("deleted".to_string(), Field::leaf(FieldType::Boolean));
            root.insert("date".to_string(), Field::leaf(FieldType::Date));
            root.insert("media".to_string(), Field::object(media_fields));

            Schema::new(root).unwrap()
        }

        #[test]
        fn scenario_1_label_filter_with_auto_sort_and_exclude_deleted() {
            let schema = schema();
            let mut config = GeneratorConfig::default();
            config.auto_sort = true;
            config.exclude_deleted_documents = true;
            config.default_object_sort_fields = vec!["score".to_string(), "name".to_string()];

            let query = parser::parse("label = bag").unwrap();
            let (compiled, _) = generate(&query, &schema, &config).unwrap();
            let json = serde_json::to_value(&compiled.query).unwrap();

            assert_eq!(json["bool"]["must"][0]["nested"]["path"], "media.label");
            assert_eq!(
                json["bool"]["must"][0]["nested"]["query"]["term"]["media.label.name"]["value"],
                "bag"
            );
            assert_eq!(json["bool"]["must_not"][0]["term"]["deleted"]["value"], "true");

            assert_eq!(compiled.sort.len(), 2);
            assert_eq!(compiled.sort[0].field, "media.label.score");
            assert_eq!(compiled.sort[0].order, Some(crate::dsl::SortOrder::Desc));
            let nested_sort = compiled.sort[0].nested.as_ref().unwrap();
            assert_eq!(nested_sort.path, "media.label");
            let sort_filter = serde_json::to_value(nested_sort.filter.as_ref().unwrap()).unwrap();
            assert_eq!(sort_filter["term"]["media.label.name"]["value"], "bag");
            assert_eq!(compiled.sort[1].field, "deleted");
            assert!(compiled.sort[1].nested.is_none());
        }

        #[test]
        fn scenario_2_date_comparison_expands_to_range() {
            let schema = schema();
            let config = GeneratorConfig::default();
            let query = parser::parse("date > 2017").unwrap();
            let (compiled, _) = generate(&query, &schema, &config).unwrap();
            let json = serde_json::to_value(&compiled.query).unwrap();

            assert_eq!(json["range"]["date"]["gte"], "2018");
            assert_eq!(json["range"]["date"]["format"], crate::date::ELASTIC_DATE_FORMAT);
            assert_eq!(json["range"]["date"]["time_zone"], "UTC");
        }

        #[test]
        fn scenario_3_not_or_group_negates_only_the_first_arm() {
            let schema = schema();
            let config = GeneratorConfig::default();
            let query = parser::parse("not label = person or label = indoor").unwrap();
            let (compiled, _) = generate(&query, &schema, &config).unwrap();
            let json = serde_json::to_value(&compiled.query).unwrap();

            assert_eq!(json["bool"]["should"].as_array().unwrap().len(), 2);
            assert_eq!(
                json["bool"]["should"][0]["bool"]["must_not"][0]["nested"]["query"]["term"]["media.label.name"]
                    ["value"],
                "person"
            );
            assert_eq!(
                json["bool"]["should"][1]["nested"]["query"]["term"]["media.label.name"]["value"],
                "indoor"
            );
        }

        #[test]
        fn scenario_4_where_clause_shares_the_nested_scope_without_warning() {
            let schema = schema();
            let config = GeneratorConfig::default();
            let query = parser::parse("color = blue where label = bag").unwrap();
            let (compiled, warnings) = generate(&query, &schema, &config).unwrap();
            let json = serde_json::to_value(&compiled.query).unwrap();

            assert_eq!(json["nested"]["path"], "media.label");
            let must = json["nested"]["query"]["bool"]["must"].as_array().unwrap();
            assert_eq!(must.len(), 2);
            assert_eq!(must[0]["term"]["media.label.color"]["value"], "blue");
            assert_eq!(must[1]["term"]["media.label.name"]["value"], "bag");
            assert!(warnings.is_empty());
        }

        #[test]
        fn scenario_5_aggreg_with_graph_nests_terms_under_media_label() {
            let schema = schema();
            let config = GeneratorConfig::default();
            let query = parser::parse("aggreg: label graph pie").unwrap();
            let (compiled, _) = generate(&query, &schema, &config).unwrap();

            let agg = compiled.aggregations.iter().find(|(k, _)| k == "aggreg_0").unwrap().1;
            let json = serde_json::to_value(agg).unwrap();
            assert_eq!(json["nested"]["path"], "media.label");
            assert_eq!(json["aggs"]["agg"]["terms"]["field"], "media.label.name");
            assert_eq!(json["aggs"]["agg"]["terms"]["size"], 11);

            let plan = compiled.plan.iter().find(|(k, _)| k == "aggreg_0").unwrap().1;
            assert_eq!(plan.graph.as_deref(), Some("pie"));
        }

        #[test]
        fn scenario_6_sort_under_with_where_resolves_nested_scope_from_under() {
            let schema = schema();
            let config = GeneratorConfig::default();
            let query = parser::parse("sort: color under label where label = bag").unwrap();
            let (compiled, _) = generate(&query, &schema, &config).unwrap();

            assert_eq!(compiled.sort.len(), 1);
            let sort = &compiled.sort[0];
            assert_eq!(sort.field, "media.label.color");
            let nested = sort.nested.as_ref().unwrap();
            assert_eq!(nested.path, "media.label");
            let filter_json = serde_json::to_value(nested.filter.as_ref().unwrap()).unwrap();
            assert_eq!(filter_json["term"]["media.label.name"]["value"], "bag");
        }
    }
}
