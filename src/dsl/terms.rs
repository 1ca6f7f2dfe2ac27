//! [Terms query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-terms-query.html)

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// A [Terms query] matches documents containing one or more exact terms in
/// a field.
///
/// [Terms query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-terms-query.html
#[derive(Clone, Debug, PartialEq)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<String>,
    pub boost: Option<f64>,
}

impl TermsQuery {
    pub fn new(field: impl Into<String>, values: Vec<String>) -> Self {
        TermsQuery {
            field: field.into(),
            values,
            boost: None,
        }
    }
}

impl Serialize for TermsQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = 1 + self.boost.is_some() as usize;
        let mut map = serializer.serialize_map(Some(entries))?;
        map.serialize_entry(&self.field, &self.values)?;
        if let Some(boost) = self.boost {
            map.serialize_entry("boost", &boost)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TermsQuery {
    fn deserialize<D>(deserializer: D) -> Result<TermsQuery, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct TermsQueryVisitor;

        impl<'de> Visitor<'de> for TermsQueryVisitor {
            type Value = TermsQuery;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a `TermsQuery`")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut field = None;
                let mut values = None;
                let mut boost = None;

                while let Some(key) = map.next_key::<String>()? {
                    if key == "boost" {
                        boost = Some(map.next_value()?);
                    } else {
                        field = Some(key);
                        values = Some(map.next_value()?);
                    }
                }

                Ok(TermsQuery {
                    field: field.ok_or_else(|| de::Error::missing_field("field"))?,
                    values: values.ok_or_else(|| de::Error::missing_field("values"))?,
                    boost,
                })
            }
        }

        deserializer.deserialize_map(TermsQueryVisitor)
    }
}
