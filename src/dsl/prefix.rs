//! [Prefix query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-prefix-query.html)

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct InnerPrefixQuery {
    value: String,
}

/// A [Prefix query] matches documents with a field beginning with the
/// given prefix.
///
/// [Prefix query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-prefix-query.html
#[derive(Clone, Debug, PartialEq)]
pub struct PrefixQuery {
    pub field: String,
    pub value: String,
}

impl PrefixQuery {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        PrefixQuery {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl Serialize for PrefixQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.field,
            &InnerPrefixQuery {
                value: self.value.clone(),
            },
        )?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for PrefixQuery {
    fn deserialize<D>(deserializer: D) -> Result<PrefixQuery, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PrefixQueryVisitor;

        impl<'de> Visitor<'de> for PrefixQueryVisitor {
            type Value = PrefixQuery;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a `PrefixQuery`")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let field = map
                    .next_key::<String>()?
                    .ok_or_else(|| de::Error::missing_field("field"))?;
                let inner: InnerPrefixQuery = map.next_value()?;
                Ok(PrefixQuery {
                    field,
                    value: inner.value,
                })
            }
        }

        deserializer.deserialize_map(PrefixQueryVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_field_keyed_map() {
        let q = PrefixQuery::new("user", "Kimchy");
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({ "user": { "value": "Kimchy" } })
        );
    }

    #[test]
    fn deserialize_missing_value_is_err() {
        let j = r#"{ "user": {} }"#;
        assert!(serde_json::from_str::<PrefixQuery>(j).is_err());
    }
}
