#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! A compiler for SEL, a concise human-friendly query language, targeting
//! an Elasticsearch-style query DSL.
//!
//! A typical caller parses user input with [`parser::parse`], resolves it
//! against a [`schema::Schema`] and [`GeneratorConfig`] via
//! [`generator::generate`] (or the bundled [`generator::Compiler`]), sends
//! the resulting [`generator::CompiledQuery::query`] to its search backend,
//! and hands the raw aggregation response back through
//! [`postformat::format_response`] using the compiled
//! [`generator::QueryPlan`].

pub mod config;
pub mod date;
pub mod dsl;
pub mod error;
pub mod generator;
pub mod ir;
pub mod parser;
pub mod postformat;
pub mod resolver;
pub mod schema;
mod similarity;

pub use config::GeneratorConfig;
pub use error::{SelError, Warning};
pub use generator::{generate, CompiledQuery, Compiler};
pub use schema::Schema;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_resolves_and_compiles_a_simple_query() {
        let mut root = BTreeMap::new();
        root.insert("title".to_string(), schema::Field::leaf(schema::FieldType::Str));
        let schema = Schema::new(root).unwrap();
        let config = GeneratorConfig::default();

        let ir = parser::parse("title = hello").unwrap();
        let (compiled, warnings) = generate(&ir, &schema, &config).unwrap();

        assert!(warnings.is_empty());
        let json = serde_json::to_value(&compiled.query).unwrap();
        assert_eq!(json["term"]["title"]["value"], "hello");
    }
}
