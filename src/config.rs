//! Compile-time configuration for the resolver and generator.
//!
//! Loading this from a config file or environment overlay is out of scope
//! for this crate (see the crate-level docs); [`GeneratorConfig`] is a
//! plain value type an embedding application builds however it likes (a
//! literal, a `toml`/`serde_json` deserialize, whatever it already uses)
//! and then passes in by reference.

use serde::{Deserialize, Serialize};

/// Default bucket size for `aggreg`/`histogram` aggregations on
/// non-date fields, used when no explicit `size` parameter is given.
pub const DEFAULT_AGGREGATION_SIZE: u64 = 10;

/// Configuration consumed by the path resolver and query generator.
///
/// Corresponds to the `Queries.*`/`Aggregations.*` options of the system
/// this crate compiles queries for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// IANA time zone attached to generated date range queries.
    pub time_zone: String,

    /// Ordered list of default sub-properties tried, in order, when
    /// resolution lands on an object/nested field during filter/context
    /// resolution (e.g. `["name", "id"]`).
    pub default_object_subfields: Vec<String>,

    /// Ordered list of default sub-properties tried when resolution lands
    /// on an object/nested field during sort resolution.
    pub default_object_sort_fields: Vec<String>,

    /// Field path used for bare `query_string` filters that don't name an
    /// explicit field.
    pub default_query_string_field: Option<String>,

    /// Whether to synthesize a sort from the top-level filters when the
    /// caller specified none.
    pub auto_sort: bool,

    /// Whether to silently add a `deleted != true` filter when the query
    /// doesn't already mention the schema's `deleted` field.
    pub exclude_deleted_documents: bool,

    /// Default bucket size for `aggreg`/`histogram` aggregations on
    /// non-date fields.
    pub aggregation_default_size: u64,

    /// Default interval for date-histogram aggregations, e.g. `"week"`.
    pub aggregation_default_date_interval: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            time_zone: "UTC".to_string(),
            default_object_subfields: vec!["name".to_string(), "id".to_string()],
            default_object_sort_fields: vec!["name".to_string(), "id".to_string()],
            default_query_string_field: None,
            auto_sort: false,
            exclude_deleted_documents: false,
            aggregation_default_size: DEFAULT_AGGREGATION_SIZE,
            aggregation_default_date_interval: "week".to_string(),
        }
    }
}
