//! The path resolver (component R): maps user-written dotted field paths
//! against a [`Schema`], handling absolute/partial matching, nested-scope
//! filtering, sub-property auto-promotion, and fuzzy suggestions on
//! failure.

use crate::error::SelError;
use crate::schema::{self, FieldType, Schema, SchemaEntry};
use crate::similarity;

/// Maximum number of fuzzy suggestions returned on a resolution failure.
const MAX_SUGGESTIONS: usize = 3;
/// Minimum similarity ratio for a field to be considered a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.6;
/// Maximum number of candidates listed in an ambiguity error before
/// truncation.
const MAX_AMBIGUOUS_CANDIDATES: usize = 6;

/// Whether (and how) a resolved field's trailing path segment names a
/// pseudo-function rather than an actual schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoFunction {
    /// No pseudo-function; the path resolves to a real field.
    None,
    /// The path ended in `.exists`.
    Exists,
    /// The path ended in `.missing`.
    Missing,
}

impl PseudoFunction {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "exists" => Some(PseudoFunction::Exists),
            "missing" => Some(PseudoFunction::Missing),
            _ => None,
        }
    }
}

/// A field successfully resolved against a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Full canonical path.
    pub path: Vec<String>,
    /// Shortest suffix of `path` that uniquely identifies the field.
    pub short_path: Vec<String>,
    /// Canonical path of the innermost enclosing nested scope, or empty.
    pub nested: Vec<String>,
    /// The resolved schema node's type.
    pub field_type: FieldType,
    /// Pseudo-function stripped from the user's path, if any.
    pub function: PseudoFunction,
    /// The user's original path text, preserved for diagnostics.
    pub query_field: String,
}

impl ResolvedField {
    /// Canonical path rendered as a dotted string.
    pub fn path_string(&self) -> String {
        schema::path_to_string(&self.path)
    }
}

/// Options controlling a single resolution call.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions<'a> {
    /// The nested context of the surrounding query at the point this field
    /// is referenced.
    pub current_nested: &'a [String],
    /// Whether a trailing `.exists`/`.missing` segment should be peeled off
    /// as a pseudo-function rather than treated as a literal field name.
    pub allow_functions: bool,
    /// Ordered list of default sub-properties tried when resolution lands
    /// on an object/nested field (e.g. `["name", "id"]`).
    pub default_subfields: &'a [String],
}

/// Resolve a user-written field path against `schema`.
pub fn resolve(
    schema: &Schema,
    query_field: &str,
    opts: ResolveOptions,
) -> Result<ResolvedField, SelError> {
    let (absolute, mut segments) = schema::parse_field_path(query_field)?;

    let mut function = PseudoFunction::None;
    if opts.allow_functions && segments.len() > 1 {
        if let Some(candidate_fn) = segments.last().and_then(|s| PseudoFunction::from_segment(s)) {
            let literal_matches = find_candidates(schema, absolute, &segments);
            if literal_matches.is_empty() {
                function = candidate_fn;
                segments.pop();
            }
        }
    }

    let entry = resolve_segments(schema, query_field, absolute, &segments, opts.current_nested)?;
    let entry = promote_sub_property(schema, entry, opts.default_subfields, query_field)?;

    Ok(ResolvedField {
        path: entry.path.clone(),
        short_path: entry.short_path.clone(),
        nested: entry.nested.clone(),
        field_type: entry.field_type,
        function,
        query_field: query_field.to_string(),
    })
}

fn find_candidates<'s>(schema: &'s Schema, absolute: bool, segments: &[String]) -> Vec<&'s SchemaEntry> {
    schema
        .entries()
        .iter()
        .filter(|e| {
            if absolute {
                e.path == segments
            } else {
                e.path_ends_with(segments)
            }
        })
        .collect()
}

fn resolve_segments<'s>(
    schema: &'s Schema,
    query_field: &str,
    absolute: bool,
    segments: &[String],
    current_nested: &[String],
) -> Result<&'s SchemaEntry, SelError> {
    let candidates = find_candidates(schema, absolute, segments);

    let valid: Vec<&SchemaEntry> = candidates
        .into_iter()
        .filter(|e| nested_context_is_valid(&e.nested, current_nested))
        .collect();

    match valid.len() {
        0 => Err(not_found_error(schema, query_field)),
        1 => Ok(valid[0]),
        _ => {
            let mut paths: Vec<String> = valid
                .iter()
                .map(|e| schema::path_to_string(&e.path))
                .collect();
            paths.sort();
            paths.truncate(MAX_AMBIGUOUS_CANDIDATES);
            Err(SelError::not_found_with_suggestions(
                format!(
                    "field '{query_field}' is ambiguous; matches: {}",
                    paths.join(", ")
                ),
                paths,
            ))
        }
    }
}

/// A candidate's nested context is valid under `current_nested` when it is
/// equal to it, or a descendant of it (i.e. `current_nested` is a proper
/// prefix of the candidate's nested context).
fn nested_context_is_valid(candidate_nested: &[String], current_nested: &[String]) -> bool {
    if candidate_nested == current_nested {
        return true;
    }
    candidate_nested.len() > current_nested.len()
        && candidate_nested[..current_nested.len()] == *current_nested
}

fn promote_sub_property<'s>(
    schema: &'s Schema,
    entry: &'s SchemaEntry,
    default_subfields: &[String],
    query_field: &str,
) -> Result<&'s SchemaEntry, SelError> {
    if !entry.field_type.is_structural() {
        return Ok(entry);
    }

    let properties = match &entry.properties {
        Some(p) => p,
        None => {
            return Err(SelError::client_input(format!(
                "field '{query_field}' has no sub-fields to resolve against"
            )))
        }
    };

    for name in default_subfields {
        if properties.contains_key(name) {
            let mut promoted_path = entry.path.clone();
            promoted_path.push(name.clone());
            if let Some(promoted) = schema.entry_with_path(&promoted_path) {
                return Ok(promoted);
            }
        }
    }

    Err(SelError::client_input(format!(
        "field '{query_field}' is an object/nested field; specify a sub-field (tried: {})",
        default_subfields.join(", ")
    )))
}

fn not_found_error(schema: &Schema, query_field: &str) -> SelError {
    let suggestions = suggest(schema, query_field);
    SelError::not_found_with_suggestions(
        format!("field '{query_field}' not found"),
        suggestions,
    )
}

/// Compute up to [`MAX_SUGGESTIONS`] fuzzy-matched field paths for a
/// not-found or ambiguous query field, excluding internal (`_`-prefixed
/// final segment) fields, with similarity `>= SUGGESTION_THRESHOLD`.
fn suggest(schema: &Schema, query_field: &str) -> Vec<String> {
    let target = query_field.trim_start_matches('.');

    let mut scored: Vec<(f64, String)> = schema
        .entries()
        .iter()
        .filter(|e| !e.path.last().map(|s| s.starts_with('_')).unwrap_or(false))
        .map(|e| {
            let path = schema::path_to_string(&e.path);
            (similarity::ratio(target, &path), path)
        })
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then_with(|| a.1.cmp(&b.1)));
    scored.truncate(MAX_SUGGESTIONS);
    scored.into_iter().map(|(_, path)| path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};
    use std::collections::BTreeMap;

    fn demo_schema() -> Schema {
        let mut label_fields = BTreeMap::new();
        label_fields.insert("name".to_string(), Field::leaf(FieldType::Str));
        label_fields.insert("score".to_string(), Field::leaf(FieldType::Float));
        label_fields.insert("color".to_string(), Field::leaf(FieldType::Str));

        let mut media_fields = BTreeMap::new();
        media_fields.insert("label".to_string(), Field::nested(label_fields));

        let mut root = BTreeMap::new();
        root.insert("deleted".to_string(), Field::leaf(FieldType::Boolean));
        root.insert("date".to_string(), Field::leaf(FieldType::Date));
        root.insert("media".to_string(), Field::object(media_fields));

        Schema::new(root).unwrap()
    }

    fn opts<'a>(current_nested: &'a [String], default_subfields: &'a [String]) -> ResolveOptions<'a> {
        ResolveOptions {
            current_nested,
            allow_functions: true,
            default_subfields,
        }
    }

    #[test]
    fn resolves_partial_path_across_nested_boundary() {
        let schema = demo_schema();
        let empty = vec![];
        let subfields = vec!["name".to_string()];
        let resolved = resolve(&schema, "label", opts(&empty, &subfields)).unwrap();
        assert_eq!(
            resolved.path,
            vec!["media".to_string(), "label".to_string(), "name".to_string()]
        );
        assert_eq!(resolved.nested, vec!["media".to_string(), "label".to_string()]);
    }

    #[test]
    fn resolves_absolute_path_exactly() {
        let schema = demo_schema();
        let empty = vec![];
        let subfields = vec![];
        let resolved = resolve(&schema, ".deleted", opts(&empty, &subfields)).unwrap();
        assert_eq!(resolved.path, vec!["deleted".to_string()]);
    }

    #[test]
    fn not_found_yields_suggestion() {
        let schema = demo_schema();
        let empty = vec![];
        let subfields = vec!["name".to_string()];
        let err = resolve(&schema, "lable.name", opts(&empty, &subfields)).unwrap_err();
        match err {
            SelError::SchemaResolution { suggestions, .. } => {
                assert!(suggestions.iter().any(|s| s.contains("label")));
            }
            _ => panic!("expected SchemaResolution"),
        }
    }

    #[test]
    fn peels_trailing_pseudo_function() {
        let schema = demo_schema();
        let empty = vec![];
        let subfields = vec!["name".to_string()];
        let resolved = resolve(&schema, "media.label.name.exists", opts(&empty, &subfields)).unwrap();
        assert_eq!(resolved.function, PseudoFunction::Exists);
        assert_eq!(
            resolved.path,
            vec!["media".to_string(), "label".to_string(), "name".to_string()]
        );
    }

    #[test]
    fn nested_context_restricts_candidates() {
        let schema = demo_schema();
        let current = vec!["media".to_string(), "label".to_string()];
        let subfields = vec![];
        let resolved = resolve(&schema, "name", opts(&current, &subfields)).unwrap();
        assert_eq!(resolved.nested, current);
    }

    #[test]
    fn underscore_prefixed_fields_excluded_from_suggestions() {
        let mut root = BTreeMap::new();
        root.insert("_internal".to_string(), Field::leaf(FieldType::Str));
        root.insert("internalize".to_string(), Field::leaf(FieldType::Str));
        let schema = Schema::new(root).unwrap();
        let suggestions = suggest(&schema, "internalide");
        assert!(!suggestions.iter().any(|s| s.starts_with('_')));
    }
}
