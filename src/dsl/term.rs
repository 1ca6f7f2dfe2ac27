//! [Term query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-term-query.html)

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct InnerTermQuery {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    boost: Option<f64>,
}

/// A [Term query] matches documents containing an exact term in a field.
///
/// [Term query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-term-query.html
#[derive(Clone, Debug, PartialEq)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
    pub boost: Option<f64>,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        TermQuery {
            field: field.into(),
            value: value.into(),
            boost: None,
        }
    }
}

impl Serialize for TermQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.field,
            &InnerTermQuery {
                value: self.value.clone(),
                boost: self.boost,
            },
        )?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for TermQuery {
    fn deserialize<D>(deserializer: D) -> Result<TermQuery, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct TermQueryVisitor;

        impl<'de> Visitor<'de> for TermQueryVisitor {
            type Value = TermQuery;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a `TermQuery`")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let field = map
                    .next_key::<String>()?
                    .ok_or_else(|| de::Error::missing_field("field"))?;
                let inner: InnerTermQuery = map.next_value()?;
                Ok(TermQuery {
                    field,
                    value: inner.value,
                    boost: inner.boost,
                })
            }
        }

        deserializer.deserialize_map(TermQueryVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_without_boost() {
        let q = TermQuery::new("deleted", "true");
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({ "deleted": { "value": "true" } })
        );
    }

    #[test]
    fn serializes_with_boost() {
        let mut q = TermQuery::new("deleted", "true");
        q.boost = Some(2.0);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({ "deleted": { "value": "true", "boost": 2.0 } })
        );
    }

    #[test]
    fn deserializes_round_trip() {
        let j = json!({ "deleted": { "value": "true" } });
        let q: TermQuery = serde_json::from_value(j).unwrap();
        assert_eq!(q, TermQuery::new("deleted", "true"));
    }
}
