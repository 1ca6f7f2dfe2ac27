//! The backend query tree: a `bool`/`nested`/leaf-query sum type modeled,
//! like this corpus's own Elasticsearch DSL crate, as a struct with one
//! field per possible query kind, each `Option`-wrapped and
//! `skip_serializing_if` none so exactly one key appears in the emitted
//! JSON.

use serde::{Deserialize, Serialize};

use super::{ExistsQuery, FunctionScoreQuery, NestedQuery, PrefixQuery, QueryStringQuery, RangeQuery, TermQuery, TermsQuery};

/// A boolean compound query: `{bool: {must, must_not, should, filter}}`.
#[cfg_attr(feature = "builder", derive(typed_builder::TypedBuilder))]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BooleanQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub must: Vec<Query>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub filter: Vec<Query>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub should: Vec<Query>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub must_not: Vec<Query>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub minimum_should_match: Option<i32>,
}

impl BooleanQuery {
    /// A boolean query with nothing in it: equivalent to `match_all` when
    /// serialized at the top level, but distinguishable from an actually
    /// empty query while being built up.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

/// Marker for `{match_all: {}}`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MatchAllQuery {}

/// The top-level query sum type: exactly one field is populated.
#[cfg_attr(feature = "builder", derive(typed_builder::TypedBuilder))]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub match_all: Option<MatchAllQuery>,

    #[serde(rename = "bool", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub boolean: Option<Box<BooleanQuery>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub term: Option<TermQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub terms: Option<TermsQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub range: Option<RangeQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub prefix: Option<PrefixQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub exists: Option<ExistsQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub query_string: Option<QueryStringQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub nested: Option<Box<NestedQuery>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "builder", builder(default))]
    pub function_score: Option<Box<FunctionScoreQuery>>,
}

impl Query {
    /// `{match_all: {}}`.
    pub fn match_all() -> Self {
        Query {
            match_all: Some(MatchAllQuery {}),
            ..Default::default()
        }
    }

    /// Wrap `self` in `{bool: {must_not: [self]}}`.
    pub fn negate(self) -> Self {
        Query::from(BooleanQuery {
            must_not: vec![self],
            ..Default::default()
        })
    }
}

macro_rules! from_leaf {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Query {
            fn from(value: $ty) -> Self {
                Query {
                    $variant: Some(value.into()),
                    ..Default::default()
                }
            }
        }
    };
}

from_leaf!(term, TermQuery);
from_leaf!(terms, TermsQuery);
from_leaf!(range, RangeQuery);
from_leaf!(prefix, PrefixQuery);
from_leaf!(exists, ExistsQuery);
from_leaf!(query_string, QueryStringQuery);

impl From<BooleanQuery> for Query {
    fn from(value: BooleanQuery) -> Self {
        Query {
            boolean: Some(Box::new(value)),
            ..Default::default()
        }
    }
}

impl From<NestedQuery> for Query {
    fn from(value: NestedQuery) -> Self {
        Query {
            nested: Some(Box::new(value)),
            ..Default::default()
        }
    }
}

impl From<FunctionScoreQuery> for Query {
    fn from(value: FunctionScoreQuery) -> Self {
        Query {
            function_score: Some(Box::new(value)),
            ..Default::default()
        }
    }
}
