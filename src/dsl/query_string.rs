//! [Query string query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-query-string-query.html)

use serde::{Deserialize, Serialize};

/// A [Query string query] supports a small boolean/wildcard mini-language
/// and is used for the `~`/`!~` comparators.
///
/// [Query string query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-query-string-query.html
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueryStringQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl QueryStringQuery {
    pub fn new(query: impl Into<String>, fields: Vec<String>) -> Self {
        QueryStringQuery {
            query: query.into(),
            fields,
        }
    }
}
