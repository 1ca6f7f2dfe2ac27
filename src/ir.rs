//! The intermediate representation (IR): a single algebraic data type
//! produced by the parser (or accepted directly as structured JSON input)
//! and consumed by the query generator.
//!
//! Every node derives `Serialize`/`Deserialize` so a caller can hand the
//! compiler either SEL text (via [`crate::parser::parse`]) or an
//! equivalent JSON document and get identical generation behavior.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An insertion-ordered string-keyed map.
///
/// `serde_json`'s `Map`/`BTreeMap` either lose insertion order or impose
/// alphabetical order; named aggregations must preserve the user's
/// insertion order (§5, ordering guarantees), so this hand-rolled
/// `Serialize`/`Deserialize` pair — in the same visitor-based style this
/// corpus uses for its other map-shaped wire types — stores entries as a
/// `Vec` of pairs and serializes them as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        OrderedMap(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, V)> {
        self.0.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of named entries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry()? {
                    items.push((key, value));
                }
                Ok(OrderedMap(items))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// A filter comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Match,
    NotMatch,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Range,
    Nrange,
    Prefix,
    Nprefix,
}

impl Comparator {
    /// Whether this comparator's positive form is negated and must be
    /// wrapped in `must_not` after translation.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            Comparator::Ne | Comparator::NotMatch | Comparator::Nin | Comparator::Nrange | Comparator::Nprefix
        )
    }

    /// The positive comparator this one translates as, before the
    /// `must_not` wrapping (if any) is applied.
    pub fn positive_form(self) -> Comparator {
        match self {
            Comparator::Ne => Comparator::Eq,
            Comparator::NotMatch => Comparator::Match,
            Comparator::Nin => Comparator::In,
            Comparator::Nrange => Comparator::Range,
            Comparator::Nprefix => Comparator::Prefix,
            other => other,
        }
    }

    /// Symbolic text form, used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Match => "~",
            Comparator::NotMatch => "!~",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::In => "in",
            Comparator::Nin => "nin",
            Comparator::Range => "range",
            Comparator::Nrange => "nrange",
            Comparator::Prefix => "prefix",
            Comparator::Nprefix => "nprefix",
        }
    }
}

/// The value side of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A single scalar value (the textual form; type coercion happens
    /// during generation once the field's schema type is known).
    Scalar(String),
    /// A list of values, used by `in`/`nin`.
    List(Vec<String>),
    /// A two-keyed comparator map, used by `range`/`nrange`:
    /// `{">=": "1", "<": "5"}`.
    Range(BTreeMap<String, String>),
}

/// Boolean group operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperator {
    And,
    Or,
}

/// Aggregation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Aggreg,
    Histogram,
    Count,
    Distinct,
    Min,
    Max,
    Sum,
    Average,
    Stats,
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort aggregation mode, used when the sorted field is multi-valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    Min,
    Max,
    Sum,
    Avg,
    Median,
}

/// A query-tree node: filters, boolean groups, nested contexts, and
/// negation all share this recursive sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// A single field comparison.
    Filter {
        field: String,
        comparator: Comparator,
        value: FilterValue,
        #[serde(skip_serializing_if = "Option::is_none")]
        r#where: Option<Box<Node>>,
    },
    /// A bare `query_string` match against the configured default field.
    QueryString { query: String },
    /// A nested-scoped sub-query rooted at `field`.
    Context {
        field: String,
        r#where: Box<Node>,
    },
    /// Logical negation of `inner`.
    Not { inner: Box<Node> },
    /// A boolean group of child nodes.
    Group {
        operator: GroupOperator,
        items: Vec<Node>,
    },
}

/// A named aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(rename = "type")]
    pub aggregation_type: AggregationType,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub under: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub subaggreg: OrderedMap<Aggregation>,
}

/// A synthetic or explicit field selected for `auto`, `null`, `random`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKeyword {
    Auto,
    Null,
    Random,
}

impl SortKeyword {
    pub fn from_field(field: &str) -> Option<SortKeyword> {
        match field {
            "auto" => Some(SortKeyword::Auto),
            "null" => Some(SortKeyword::Null),
            "random" => Some(SortKeyword::Random),
            _ => None,
        }
    }
}

/// A single sort item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SortMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub under: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Set internally by auto-sort synthesis to suppress "unnecessary
    /// where/context" warnings on synthesized sorts; never set by a caller.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_sort: bool,
}

/// The top-level compiled query: an optional filter tree, named
/// aggregations (insertion order preserved), and sorts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Node>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub aggregations: OrderedMap<Aggregation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Sort>,
}
