//! Sort translation (§4.3.5): field/mode/order defaults, nested scoping,
//! `random` → `function_score`, and auto-sort synthesis from the top-level
//! filters when the caller supplied none.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::dsl::{NestedSort, Query, SortMode as DslSortMode, SortOrder as DslSortOrder, SortQuery};
use crate::error::{SelError, Warnings};
use crate::ir::{GroupOperator, Node, Sort, SortKeyword, SortMode, SortOrder};
use crate::resolver::{self, ResolveOptions};
use crate::schema::{self, Schema};
use crate::GeneratorConfig;

/// The non-`random` sort entries, plus whether `random` was requested (with
/// its seed) and the effective auto-sort flag after `auto`/`null` keywords
/// have been consumed.
pub(crate) struct TranslatedSorts {
    pub entries: Vec<SortQuery>,
    pub random_seed: Option<i64>,
    pub auto_sort: bool,
}

pub(crate) fn translate_sorts(
    ir_sorts: &[Sort],
    schema: &Schema,
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> Result<TranslatedSorts, SelError> {
    let mut entries = Vec::new();
    let mut wants_random = false;
    let mut random_seed = None;
    let mut auto_sort_override = None;

    for sort in ir_sorts {
        if let Some(keyword) = SortKeyword::from_field(&sort.field) {
            match keyword {
                SortKeyword::Auto => auto_sort_override = Some(true),
                SortKeyword::Null => auto_sort_override = Some(false),
                SortKeyword::Random => {
                    wants_random = true;
                    random_seed = sort.seed;
                }
            }
            continue;
        }
        entries.push(translate_single_sort(sort, schema, config, warnings)?);
    }

    Ok(TranslatedSorts {
        entries,
        random_seed: if wants_random { Some(random_seed.unwrap_or_else(default_seed)) } else { None },
        auto_sort: auto_sort_override.unwrap_or(config.auto_sort),
    })
}

fn default_seed() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

fn translate_single_sort(
    sort: &Sort,
    schema: &Schema,
    config: &GeneratorConfig,
    warnings: &mut Warnings,
) -> Result<SortQuery, SelError> {
    let resolved = resolver::resolve(
        schema,
        &sort.field,
        ResolveOptions { current_nested: &[], allow_functions: false, default_subfields: &config.default_object_sort_fields },
    )?;

    let nested_path = match &sort.under {
        Some(under_field) => {
            let under_resolved = resolver::resolve(
                schema,
                under_field,
                ResolveOptions { current_nested: &[], allow_functions: false, default_subfields: &config.default_object_subfields },
            )?;
            under_resolved.nested
        }
        None => resolved.nested.clone(),
    };

    if !sort.auto_sort && nested_path.is_empty() && (sort.under.is_some() || sort.r#where.is_some()) {
        warnings.push(format!(
            "sort on '{}' has `under`/`where` but resolves outside any nested scope",
            sort.field
        ));
    }

    let nested = if nested_path.is_empty() {
        None
    } else {
        let filter_query = match &sort.r#where {
            Some(where_node) => super::group::translate_node(where_node, schema, config, &nested_path, warnings)?,
            None => Query::match_all(),
        };
        Some(NestedSort { path: schema::path_to_string(&nested_path), filter: Some(Box::new(filter_query)) })
    };

    Ok(SortQuery {
        field: resolved.path_string(),
        order: Some(map_order(sort.order.unwrap_or(SortOrder::Desc))),
        mode: Some(map_mode(sort.mode.unwrap_or(SortMode::Avg))),
        nested,
    })
}

fn map_order(order: SortOrder) -> DslSortOrder {
    match order {
        SortOrder::Asc => DslSortOrder::Asc,
        SortOrder::Desc => DslSortOrder::Desc,
    }
}

fn map_mode(mode: SortMode) -> DslSortMode {
    match mode {
        SortMode::Min => DslSortMode::Min,
        SortMode::Max => DslSortMode::Max,
        SortMode::Sum => DslSortMode::Sum,
        SortMode::Avg => DslSortMode::Avg,
        SortMode::Median => DslSortMode::Median,
    }
}

/// Collect the `Filter` leaves reachable through a top-level filter tree's
/// boolean structure, left to right, without descending into a filter's own
/// `where` clause.
fn flatten_top_level_filters(node: &Node) -> Vec<&Node> {
    match node {
        Node::Filter { .. } => vec![node],
        Node::Not { inner } => flatten_top_level_filters(inner),
        Node::Group { items, .. } => items.iter().flat_map(flatten_top_level_filters).collect(),
        Node::Context { .. } | Node::QueryString { .. } => vec![],
    }
}

fn innermost_chained_field(node: &Node) -> &str {
    match node {
        Node::Filter { field, r#where: Some(w), .. } => innermost_chained_field(w),
        Node::Filter { field, r#where: None, .. } => field,
        _ => "",
    }
}

/// The filter node stripped of its own `where`, ANDed with its immediate
/// `where`-child (left as-is) when one was present.
fn collapsed_filter_for_sort(node: &Node) -> Node {
    match node {
        Node::Filter { field, comparator, value, r#where: Some(w) } => {
            let bare = Node::Filter { field: field.clone(), comparator: *comparator, value: value.clone(), r#where: None };
            Node::Group { operator: GroupOperator::And, items: vec![bare, (**w).clone()] }
        }
        Node::Filter { field, comparator, value, r#where: None } => {
            Node::Filter { field: field.clone(), comparator: *comparator, value: value.clone(), r#where: None }
        }
        other => other.clone(),
    }
}

/// Synthesize up to 3 sorts from the top-level filters when the caller gave
/// no explicit sort and auto-sort is enabled (§4.3.5).
pub(crate) fn synthesize_auto_sorts(
    top: &Node,
    schema: &Schema,
    config: &GeneratorConfig,
) -> Result<Vec<SortQuery>, SelError> {
    let mut synthesized = Vec::new();
    for node in flatten_top_level_filters(top) {
        if synthesized.len() >= 3 {
            break;
        }
        let field_text = innermost_chained_field(node);
        if field_text.is_empty() {
            continue;
        }
        let resolved = match resolver::resolve(
            schema,
            field_text,
            ResolveOptions { current_nested: &[], allow_functions: true, default_subfields: &config.default_object_sort_fields },
        ) {
            Ok(r) => r,
            Err(_) => continue,
        };

        let nested = if resolved.nested.is_empty() {
            None
        } else {
            let where_node = collapsed_filter_for_sort(node);
            let mut scratch = Warnings::new();
            let filter_query = super::group::translate_node(&where_node, schema, config, &resolved.nested, &mut scratch)?;
            Some(NestedSort { path: schema::path_to_string(&resolved.nested), filter: Some(Box::new(filter_query)) })
        };

        synthesized.push(SortQuery {
            field: resolved.path_string(),
            order: Some(DslSortOrder::Desc),
            mode: Some(DslSortMode::Avg),
            nested,
        });
    }
    Ok(synthesized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Comparator, FilterValue};
    use crate::schema::{Field, FieldType};
    use std::collections::BTreeMap;

    fn demo_schema() -> Schema {
        let mut root = BTreeMap::new();
        root.insert("date".to_string(), Field::leaf(FieldType::Date));
        root.insert("score".to_string(), Field::leaf(FieldType::Float));
        Schema::new(root).unwrap()
    }

    #[test]
    fn plain_sort_defaults_to_desc_avg() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let sorts = vec![Sort {
            field: "score".to_string(),
            order: None,
            mode: None,
            under: None,
            r#where: None,
            seed: None,
            auto_sort: false,
        }];
        let out = translate_sorts(&sorts, &schema, &config, &mut warnings).unwrap();
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].order, Some(DslSortOrder::Desc));
        assert_eq!(out.entries[0].mode, Some(DslSortMode::Avg));
    }

    #[test]
    fn random_keyword_is_consumed_separately() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let mut warnings = Warnings::new();
        let sorts = vec![Sort {
            field: "random".to_string(),
            order: None,
            mode: None,
            under: None,
            r#where: None,
            seed: Some(42),
            auto_sort: false,
        }];
        let out = translate_sorts(&sorts, &schema, &config, &mut warnings).unwrap();
        assert!(out.entries.is_empty());
        assert_eq!(out.random_seed, Some(42));
    }

    #[test]
    fn auto_sort_synthesizes_from_top_level_filters() {
        let schema = demo_schema();
        let config = GeneratorConfig::default();
        let top = Node::Filter {
            field: "score".to_string(),
            comparator: Comparator::Gt,
            value: FilterValue::Scalar("1".to_string()),
            r#where: None,
        };
        let out = synthesize_auto_sorts(&top, &schema, &config).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].field, "score");
    }
}
