//! [Sort](https://www.elastic.co/guide/en/elasticsearch/reference/current/sort-search-results.html)
//! clause, field-keyed like [`super::TermQuery`] and friends, extended
//! with the `nested` sub-clause used to sort by a field inside a
//! `nested`-typed path.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::Query;

/// Sort order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort aggregation mode for multi-valued fields.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    Min,
    Max,
    Sum,
    Avg,
    Median,
}

/// The `nested` sub-clause of a sort entry, scoping it to documents
/// matching `filter` under `path`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NestedSort {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Query>>,
}

#[derive(Serialize, Deserialize, Default)]
struct InnerSortQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<SortMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nested: Option<NestedSort>,
}

/// A single `{field: {order, mode, nested}}` sort entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SortQuery {
    pub field: String,
    pub order: Option<SortOrder>,
    pub mode: Option<SortMode>,
    pub nested: Option<NestedSort>,
}

impl SortQuery {
    pub fn new(field: impl Into<String>) -> Self {
        SortQuery {
            field: field.into(),
            ..Default::default()
        }
    }
}

impl Serialize for SortQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.field,
            &InnerSortQuery {
                order: self.order,
                mode: self.mode,
                nested: self.nested.clone(),
            },
        )?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for SortQuery {
    fn deserialize<D>(deserializer: D) -> Result<SortQuery, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SortQueryVisitor;

        impl<'de> Visitor<'de> for SortQueryVisitor {
            type Value = SortQuery;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a `SortQuery`")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let field = map
                    .next_key::<String>()?
                    .ok_or_else(|| de::Error::missing_field("field"))?;
                let inner: InnerSortQuery = map.next_value()?;
                Ok(SortQuery {
                    field,
                    order: inner.order,
                    mode: inner.mode,
                    nested: inner.nested,
                })
            }
        }

        deserializer.deserialize_map(SortQueryVisitor)
    }
}
