//! [Function score query](https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-function-score-query.html)
//!
//! Used exclusively to implement `sort: random`: a `random_score` function
//! wraps the base query so matching documents are returned in a
//! (optionally seeded) pseudo-random order instead of by relevance.

use serde::{Deserialize, Serialize};

use super::Query;

/// The `random_score` scoring function. A `seed` makes the ordering
/// reproducible across requests against the same index state; without one
/// Elasticsearch reseeds on every request.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RandomScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// One entry of a `function_score` query's `functions` array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreFunction {
    pub random_score: RandomScore,
}

/// A [Function score query] wrapping the base query with a single
/// `random_score` function and `boost_mode: replace`, so relevance scoring
/// is fully discarded in favor of the random value.
///
/// [Function score query]: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-function-score-query.html
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionScoreQuery {
    pub query: Box<Query>,
    pub functions: Vec<ScoreFunction>,
    pub boost_mode: String,
}

impl FunctionScoreQuery {
    /// Wrap `query` with a `random_score` function, optionally seeded.
    pub fn random(query: impl Into<Query>, seed: Option<i64>) -> Self {
        FunctionScoreQuery {
            query: Box::new(query.into()),
            functions: vec![ScoreFunction {
                random_score: RandomScore { seed, field: None },
            }],
            boost_mode: "replace".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::MatchAllQuery;
    use serde_json::json;

    #[test]
    fn random_without_seed_serializes_empty_random_score() {
        let fs = FunctionScoreQuery::random(Query::match_all(), None);
        assert_eq!(
            serde_json::to_value(&fs).unwrap(),
            json!({
                "query": { "match_all": {} },
                "functions": [{ "random_score": {} }],
                "boost_mode": "replace"
            })
        );
    }

    #[test]
    fn random_with_seed_includes_seed() {
        let fs = FunctionScoreQuery::random(Query::match_all(), Some(42));
        assert_eq!(
            serde_json::to_value(&fs).unwrap()["functions"][0]["random_score"]["seed"],
            json!(42)
        );
    }

    #[test]
    fn match_all_marker_is_reachable_from_dsl() {
        let _ = MatchAllQuery::default();
    }
}
