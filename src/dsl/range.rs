//! [Range query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-range-query.html)

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default)]
struct InnerRangeQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

/// A [Range query] matches documents with field values inside the given
/// bounds.
///
/// At least one of `gt`/`gte` and one of `lt`/`lte` may be set (mutually
/// exclusive within each pair); `format`/`time_zone` are used for date
/// ranges.
///
/// [Range query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-range-query.html
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub format: Option<String>,
    pub time_zone: Option<String>,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>) -> Self {
        RangeQuery {
            field: field.into(),
            ..Default::default()
        }
    }
}

impl Serialize for RangeQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.field,
            &InnerRangeQuery {
                gt: self.gt.clone(),
                gte: self.gte.clone(),
                lt: self.lt.clone(),
                lte: self.lte.clone(),
                format: self.format.clone(),
                time_zone: self.time_zone.clone(),
            },
        )?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for RangeQuery {
    fn deserialize<D>(deserializer: D) -> Result<RangeQuery, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RangeQueryVisitor;

        impl<'de> Visitor<'de> for RangeQueryVisitor {
            type Value = RangeQuery;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a `RangeQuery`")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let field = map
                    .next_key::<String>()?
                    .ok_or_else(|| de::Error::missing_field("field"))?;
                let inner: InnerRangeQuery = map.next_value()?;

                if inner.gt.is_none() && inner.gte.is_none() && inner.lt.is_none() && inner.lte.is_none() {
                    return Err(de::Error::custom("range query requires at least one bound"));
                }

                Ok(RangeQuery {
                    field,
                    gt: inner.gt,
                    gte: inner.gte,
                    lt: inner.lt,
                    lte: inner.lte,
                    format: inner.format,
                    time_zone: inner.time_zone,
                })
            }
        }

        deserializer.deserialize_map(RangeQueryVisitor)
    }
}
