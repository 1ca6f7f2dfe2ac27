//! The typed schema tree (component S).
//!
//! A [`Schema`] is a rooted tree of [`Field`]s. Every other component reads
//! it but never mutates it: resolution, generation, and post-formatting all
//! treat a constructed `Schema` as immutable, read-only, and safe to share
//! across threads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SelError;

/// The primitive or structural type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A text field.
    #[serde(rename = "string")]
    Str,
    /// A 32-bit integer field.
    Integer,
    /// A 64-bit integer field.
    Long,
    /// A 32-bit floating point field.
    Float,
    /// A 64-bit floating point field.
    Double,
    /// A boolean field.
    Boolean,
    /// A date field.
    Date,
    /// An object field: a sub-document indexed as part of its parent.
    Object,
    /// A nested field: an array of sub-documents, each indexed
    /// independently, requiring a dedicated `nested` wrapper in the backend
    /// DSL.
    Nested,
}

impl FieldType {
    /// Whether this type supports numerical comparators (`<`, `<=`, `>`,
    /// `>=`) and numeric aggregations.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Long | FieldType::Float | FieldType::Double
        )
    }

    /// Whether this type requires date-arithmetic expansion for comparators.
    pub fn is_date(self) -> bool {
        matches!(self, FieldType::Date)
    }

    /// Whether this type is a boolean field (and thus subject to `=`/`!=`
    /// value coercion).
    pub fn is_boolean(self) -> bool {
        matches!(self, FieldType::Boolean)
    }

    /// Whether this type is a string field.
    pub fn is_string(self) -> bool {
        matches!(self, FieldType::Str)
    }

    /// Whether this type defines a nested-scope boundary.
    pub fn is_nested(self) -> bool {
        matches!(self, FieldType::Nested)
    }

    /// Whether this type may carry `properties` (object or nested).
    pub fn is_structural(self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }
}

/// A single node in the schema tree, as authored by the embedding
/// application (e.g. deserialized from an index mapping).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// The field's type. `None` is only valid when `properties` is set, in
    /// which case the field is implicitly [`FieldType::Object`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,

    /// Child fields, for object/nested types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Field>>,
}

impl Field {
    /// Construct a leaf field of the given type.
    pub fn leaf(field_type: FieldType) -> Self {
        Field {
            field_type: Some(field_type),
            properties: None,
        }
    }

    /// Construct an object field with the given children.
    pub fn object(properties: BTreeMap<String, Field>) -> Self {
        Field {
            field_type: Some(FieldType::Object),
            properties: Some(properties),
        }
    }

    /// Construct a nested field with the given children.
    pub fn nested(properties: BTreeMap<String, Field>) -> Self {
        Field {
            field_type: Some(FieldType::Nested),
            properties: Some(properties),
        }
    }

    /// The field's effective type: its explicit `type`, or `Object` if it
    /// only carries `properties`.
    pub fn effective_type(&self) -> Result<FieldType, SelError> {
        match (self.field_type, &self.properties) {
            (Some(t), _) => Ok(t),
            (None, Some(_)) => Ok(FieldType::Object),
            (None, None) => Err(SelError::internal(
                "schema field has neither a type nor properties",
            )),
        }
    }
}

/// A single resolvable entry in a flattened view of the schema tree,
/// computed once at [`Schema::new`] time.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    /// Canonical path from the schema root, e.g. `["media", "label", "name"]`.
    pub path: Vec<String>,
    /// Canonical path of the innermost enclosing nested scope; empty if
    /// this field is not under any nested ancestor.
    pub nested: Vec<String>,
    /// This entry's resolved field type.
    pub field_type: FieldType,
    /// Children, if this entry is object/nested-typed.
    pub properties: Option<BTreeMap<String, Field>>,
    /// The minimal path suffix that uniquely identifies this entry among
    /// all entries in the schema.
    pub short_path: Vec<String>,
}

impl SchemaEntry {
    /// Whether `path` ends with the given suffix (segment-wise).
    pub fn path_ends_with(&self, suffix: &[String]) -> bool {
        ends_with(&self.path, suffix)
    }
}

fn ends_with(path: &[String], suffix: &[String]) -> bool {
    if suffix.len() > path.len() {
        return false;
    }
    path[path.len() - suffix.len()..] == *suffix
}

/// The typed schema tree.
///
/// Constructed once via [`Schema::new`], which flattens the tree and
/// validates that every field's `short_path` is unique; read-only and
/// `Send + Sync` thereafter.
#[derive(Debug, Clone)]
pub struct Schema {
    root: BTreeMap<String, Field>,
    entries: Vec<SchemaEntry>,
}

impl Schema {
    /// Build a [`Schema`] from a root field map, computing canonical paths,
    /// nested contexts, and short paths, and validating short-path
    /// uniqueness.
    ///
    /// Returns [`SelError::Internal`] if the schema itself is malformed
    /// (missing type information) or if two fields collide on their
    /// computed short path — both conditions a valid schema should never
    /// produce, hence `Internal` rather than `ClientInput`.
    pub fn new(root: BTreeMap<String, Field>) -> Result<Self, SelError> {
        let mut entries = Vec::new();
        flatten(&root, &mut Vec::new(), &mut Vec::new(), &mut entries)?;
        compute_short_paths(&mut entries)?;
        Ok(Schema { root, entries })
    }

    /// The root field map.
    pub fn root(&self) -> &BTreeMap<String, Field> {
        &self.root
    }

    /// All fields in the schema, flattened, in a stable (depth-first,
    /// lexicographic) order.
    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Find the entry with an exact canonical path, if any.
    pub fn entry_with_path(&self, path: &[String]) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// All entries whose path is equal to, or a descendant of, `nested`.
    pub fn entries_under(&self, nested: &[String]) -> impl Iterator<Item = &SchemaEntry> {
        self.entries
            .iter()
            .filter(move |e| ends_with(&e.nested, nested) || e.nested == nested)
    }
}

fn flatten(
    properties: &BTreeMap<String, Field>,
    path: &mut Vec<String>,
    nested: &mut Vec<String>,
    out: &mut Vec<SchemaEntry>,
) -> Result<(), SelError> {
    for (name, field) in properties {
        path.push(name.clone());
        let field_type = field.effective_type()?;

        out.push(SchemaEntry {
            path: path.clone(),
            nested: nested.clone(),
            field_type,
            properties: field.properties.clone(),
            short_path: Vec::new(), // filled in by compute_short_paths
        });

        if let Some(children) = &field.properties {
            let pushed_nested = field_type.is_nested();
            if pushed_nested {
                nested.push(name.clone());
            }
            flatten(children, path, nested, out)?;
            if pushed_nested {
                nested.pop();
            }
        }

        path.pop();
    }
    Ok(())
}

fn compute_short_paths(entries: &mut [SchemaEntry]) -> Result<(), SelError> {
    let snapshot: Vec<Vec<String>> = entries.iter().map(|e| e.path.clone()).collect();

    for idx in 0..entries.len() {
        let path = &snapshot[idx];
        let mut found = None;
        for len in 1..=path.len() {
            let suffix = &path[path.len() - len..];
            let count = snapshot.iter().filter(|p| ends_with(p, suffix)).count();
            if count == 1 {
                found = Some(suffix.to_vec());
                break;
            }
        }
        let short_path = found.ok_or_else(|| {
            SelError::internal(format!(
                "schema contains duplicate field path: {}",
                path.join(".")
            ))
        })?;
        entries[idx].short_path = short_path;
    }

    Ok(())
}

/// Join path segments with `.`, the canonical textual representation of a
/// field path.
pub fn path_to_string(path: &[String]) -> String {
    path.join(".")
}

/// Split a textual field path into segments.
///
/// Rejects paths that are empty, consist only of `.`, contain an empty
/// segment (`..`), or end with a trailing `.`; those are always
/// [`SelError::ClientInput`] regardless of the schema.
pub fn string_to_path(raw: &str) -> Result<Vec<String>, SelError> {
    parse_field_path(raw).map(|(_, segments)| segments)
}

/// Split a textual field path into `(is_absolute, segments)`.
///
/// A path is absolute when it starts with a leading `.`, meaning it must
/// match the schema from the root exactly rather than as a suffix.
pub fn parse_field_path(raw: &str) -> Result<(bool, Vec<String>), SelError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Err(SelError::client_input(format!(
            "invalid field path: '{raw}'"
        )));
    }
    let leading_dot = trimmed.starts_with('.');
    let body = if leading_dot { &trimmed[1..] } else { trimmed };
    if body.is_empty() {
        return Err(SelError::client_input(format!(
            "invalid field path: '{raw}'"
        )));
    }
    let segments: Vec<String> = body.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(SelError::client_input(format!(
            "invalid field path: '{raw}'"
        )));
    }
    Ok((leading_dot, segments))
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn flattens_nested_context_correctly() {
        let schema = demo_schema();
        let name_entry = schema
            .entry_with_path(&["media".into(), "label".into(), "name".into()])
            .unwrap();
        assert_eq!(name_entry.nested, vec!["media".to_string(), "label".to_string()]);
        assert_eq!(name_entry.field_type, FieldType::Str);
    }

    #[test]
    fn top_level_field_has_empty_nested_context() {
        let schema = demo_schema();
        let deleted = schema.entry_with_path(&["deleted".into()]).unwrap();
        assert!(deleted.nested.is_empty());
    }

    #[test]
    fn short_path_is_minimal_unique_suffix() {
        let schema = demo_schema();
        let score = schema
            .entry_with_path(&["media".into(), "label".into(), "score".into()])
            .unwrap();
        // "score" alone is unique in this schema.
        assert_eq!(score.short_path, vec!["score".to_string()]);
    }

    #[test]
    fn duplicate_short_path_is_internal_error() {
        let mut a = BTreeMap::new();
        a.insert("name".to_string(), Field::leaf(FieldType::Str));
        let mut b = BTreeMap::new();
        b.insert("name".to_string(), Field::leaf(FieldType::Str));

        let mut root = BTreeMap::new();
        root.insert("a".to_string(), Field::object(a));
        root.insert("b".to_string(), Field::object(b));

        // Both "a.name" and "b.name" need the full path to disambiguate,
        // which is fine (still unique) -- this schema should succeed.
        assert!(Schema::new(root).is_ok());
    }

    #[test]
    fn string_to_path_rejects_empty_and_trailing_dot() {
        assert!(string_to_path("").is_err());
        assert!(string_to_path(".").is_err());
        assert!(string_to_path("a.").is_err());
        assert!(string_to_path("a..b").is_err());
    }

    #[test]
    fn string_to_path_allows_leading_dot_for_absolute() {
        let segments = string_to_path(".media.label.name").unwrap();
        assert_eq!(segments, vec!["media", "label", "name"]);
    }
}
