//! Error taxonomy and the non-fatal warning channel.
//!
//! Every fallible entry point in this crate returns [`SelError`]. There are
//! exactly three kinds, matching the three failure categories a query
//! compiler can produce: bad input from the caller, a field that could not
//! be resolved against the schema, and an invariant violated by the crate
//! itself.

use std::fmt;

/// The error type returned by every fallible operation in this crate.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SelError {
    /// Invalid syntax, an invalid value for a field's type, a disallowed
    /// comparator, a malformed range, `where` used on a non-nested field,
    /// an unknown operator, and so on. User-facing and non-retryable.
    #[error("{message}")]
    ClientInput {
        /// Human-readable description of what was wrong with the input.
        message: String,
    },

    /// A field path could not be resolved against the schema: either no
    /// field matched, or more than one did.
    #[error("{message}")]
    SchemaResolution {
        /// Human-readable description of the resolution failure.
        message: String,
        /// Up to three fuzzy-matched field paths the caller might have meant.
        suggestions: Vec<String>,
    },

    /// An invariant was violated that valid input should never be able to
    /// trigger (e.g. a schema with no root, or a short-path collision that
    /// validation should have already caught).
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable description of the violated invariant.
        message: String,
    },
}

impl SelError {
    /// Construct a [`SelError::ClientInput`].
    pub fn client_input(message: impl Into<String>) -> Self {
        SelError::ClientInput {
            message: message.into(),
        }
    }

    /// Construct a [`SelError::SchemaResolution`] with no suggestions.
    pub fn not_found(message: impl Into<String>) -> Self {
        SelError::SchemaResolution {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Construct a [`SelError::SchemaResolution`] carrying suggestions.
    pub fn not_found_with_suggestions(message: impl Into<String>, suggestions: Vec<String>) -> Self {
        SelError::SchemaResolution {
            message: message.into(),
            suggestions,
        }
    }

    /// Construct a [`SelError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        SelError::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SelError {
    /// Structured query input that fails to deserialize is the caller's
    /// fault, not ours.
    fn from(err: serde_json::Error) -> Self {
        SelError::client_input(format!("invalid structured query input: {err}"))
    }
}

/// A single non-fatal advisory produced while compiling a query.
///
/// Warnings never abort a compilation; they accumulate in a [`Warnings`]
/// channel threaded explicitly through the generator and are deduplicated
/// only once, at the outermost boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Warning(pub String);

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Warning {
    /// Construct a warning from anything that can become a `String`.
    pub fn new(message: impl Into<String>) -> Self {
        Warning(message.into())
    }
}

/// Explicit in-out accumulator for [`Warning`]s.
///
/// Passed as `&mut Warnings` through generator functions rather than
/// returned from each one; deduplicated once the whole compilation has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    /// An empty warning accumulator.
    pub fn new() -> Self {
        Warnings(Vec::new())
    }

    /// Push a new warning onto the accumulator, logging it immediately.
    pub fn push(&mut self, message: impl Into<String>) {
        let warning = Warning::new(message);
        log::warn!("{warning}");
        self.0.push(warning);
    }

    /// Drain the accumulator into a deduplicated, stably-ordered `Vec`.
    ///
    /// Deduplication happens here, and only here — per-call deduplication
    /// would hide genuinely distinct warnings raised in separate branches of
    /// the same compilation that happen to carry the same message at an
    /// intermediate point but would diverge later.
    pub fn into_deduped(mut self) -> Vec<Warning> {
        let mut seen = std::collections::HashSet::new();
        self.0.retain(|w| seen.insert(w.clone()));
        self.0
    }

    /// Number of warnings currently accumulated (pre-dedup).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the accumulator is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_input_displays_message() {
        let err = SelError::client_input("bad comparator");
        assert_eq!(err.to_string(), "bad comparator");
    }

    #[test]
    fn schema_resolution_carries_suggestions() {
        let err = SelError::not_found_with_suggestions(
            "field 'lable' not found",
            vec!["label".to_string()],
        );
        match err {
            SelError::SchemaResolution { suggestions, .. } => {
                assert_eq!(suggestions, vec!["label".to_string()]);
            }
            _ => panic!("expected SchemaResolution"),
        }
    }

    #[test]
    fn warnings_dedup_preserves_first_occurrence_order() {
        let mut warnings = Warnings::new();
        warnings.push("a");
        warnings.push("b");
        warnings.push("a");
        let deduped = warnings.into_deduped();
        assert_eq!(deduped, vec![Warning::new("a"), Warning::new("b")]);
    }

    #[test]
    fn empty_warnings_is_empty() {
        let warnings = Warnings::new();
        assert!(warnings.is_empty());
        assert_eq!(warnings.len(), 0);
    }
}
