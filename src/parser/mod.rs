//! The surface-syntax parser (component P): turns SEL query text into
//! [`crate::ir::Query`].
//!
//! ```
//! # use sel_query::parser::parse;
//! let query = parse("label = bag and date > 2017").unwrap();
//! assert!(query.query.is_some());
//! ```

mod grammar;
mod lexer;

use crate::error::SelError;
use crate::ir::Query;

/// Parse SEL query text into the intermediate representation.
///
/// Structured JSON input bypasses this function entirely: deserialize
/// straight into [`crate::ir::Query`] via `serde_json`.
pub fn parse(input: &str) -> Result<Query, SelError> {
    log::debug!("parsing query text ({} bytes)", input.len());
    let tokens = lexer::lex(input)?;
    let query = grammar::Parser::new(input, tokens).parse_query()?;
    log::debug!(
        "parsed query: has_filter={} aggregations={} sorts={}",
        query.query.is_some(),
        query.aggregations.len(),
        query.sort.len()
    );
    Ok(query)
}
