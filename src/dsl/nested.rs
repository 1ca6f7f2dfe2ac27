//! [Nested query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-nested-query.html)
//! and the [Reverse nested aggregation](https://www.elastic.co/guide/en/elasticsearch/reference/current/search-aggregations-bucket-reverse-nested-aggregation.html)
//! construct used to escape back out of a nested scope during aggregation.

use serde::{Deserialize, Serialize};

use super::Query;

/// A [Nested query] searches a `nested`-typed field as if its sub-objects
/// were indexed as separate documents, surfacing the root parent document
/// on a match.
///
/// [Nested query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-nested-query.html
#[cfg_attr(feature = "builder", derive(typed_builder::TypedBuilder))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NestedQuery {
    pub path: String,
    #[cfg_attr(feature = "builder", builder(setter(into)))]
    pub query: Box<Query>,
}

impl NestedQuery {
    pub fn new(path: impl Into<String>, query: impl Into<Query>) -> Self {
        NestedQuery {
            path: path.into(),
            query: Box::new(query.into()),
        }
    }
}

/// The `reverse_nested` aggregation sub-clause: escapes from the current
/// nested scope back up to `path`, or to the root document if `path` is
/// `None`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ReverseNested {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
