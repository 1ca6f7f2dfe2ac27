//! [Exists query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-exists-query.html)

use serde::{Deserialize, Serialize};

/// An [Exists query] matches documents that have a non-null value for the
/// given field.
///
/// [Exists query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-exists-query.html
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExistsQuery {
    pub field: String,
}

impl ExistsQuery {
    pub fn new(field: impl Into<String>) -> Self {
        ExistsQuery { field: field.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_plainly() {
        let q = ExistsQuery::new("label.name");
        assert_eq!(serde_json::to_value(&q).unwrap(), json!({ "field": "label.name" }));
    }
}
