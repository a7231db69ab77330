//! Table identifier derivation and validation.
//!
//! Every dynamically-named table in the store gets its name from
//! user-entered text: lower-cased, whitespace runs collapsed to `_`, then
//! checked against the identifier grammar `^[a-zA-Z_][a-zA-Z0-9_]*$`.
//! Derivation is pure and deterministic: the same name always yields the
//! same identifier, which is what makes a display name a durable key to a
//! dynamic table.
//!
//! Anything that fails the grammar is rejected with
//! [`StoreError::InvalidIdentifier`] before a single schema statement runs.

use crate::error::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier grammar regex is valid")
});

/// A validated table identifier.
///
/// Construction goes through [`TableIdent::derive`] (from a display name) or
/// [`TableIdent::checked`] (from a string persisted at creation time), so a
/// `TableIdent` in hand is always safe to splice into a schema statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdent(String);

impl TableIdent {
    /// Derive an identifier from a display name.
    ///
    /// Lower-cases, trims, and collapses interior whitespace runs to a
    /// single `_`, then validates the result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidIdentifier` when the normalized string
    /// does not satisfy the identifier grammar (e.g. `"a b!"`, `"9lives"`,
    /// or an all-whitespace name).
    pub fn derive(name: &str) -> Result<Self, StoreError> {
        let mut out = String::with_capacity(name.len());
        let mut pending_separator = false;
        for ch in name.trim().chars() {
            if ch.is_whitespace() {
                pending_separator = true;
                continue;
            }
            if pending_separator {
                out.push('_');
                pending_separator = false;
            }
            out.extend(ch.to_lowercase());
        }
        Self::checked(out).map_err(|_| {
            StoreError::InvalidIdentifier(format!(
                "name {name:?} does not normalize to a safe table identifier"
            ))
        })
    }

    /// Wrap a string that must already satisfy the identifier grammar.
    ///
    /// Used when reading identifiers persisted at entity-creation time back
    /// out of storage.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidIdentifier` when the string fails the
    /// grammar.
    pub fn checked(raw: impl Into<String>) -> Result<Self, StoreError> {
        let raw = raw.into();
        if is_valid(&raw) {
            Ok(Self(raw))
        } else {
            Err(StoreError::InvalidIdentifier(format!(
                "{raw:?} is not a safe table identifier"
            )))
        }
    }

    /// The fixed root table holding category rows.
    pub fn categories() -> Self {
        Self("categories".to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier double-quoted for direct use in a statement.
    pub(crate) fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl std::fmt::Display for TableIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// True iff `candidate` matches `^[a-zA-Z_][a-zA-Z0-9_]*$`.
pub fn is_valid(candidate: &str) -> bool {
    IDENT_RE.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_examples() {
        assert_eq!(TableIdent::derive("Electronics").unwrap().as_str(), "electronics");
        assert_eq!(TableIdent::derive("IT Equipments").unwrap().as_str(), "it_equipments");
        assert_eq!(TableIdent::derive("P C").unwrap().as_str(), "p_c");
        assert_eq!(TableIdent::derive("PC").unwrap().as_str(), "pc");
    }

    #[test]
    fn test_derive_is_deterministic() {
        for name in ["PC", "Office  Chairs", "laptop"] {
            assert_eq!(
                TableIdent::derive(name).unwrap(),
                TableIdent::derive(name).unwrap()
            );
        }
    }

    #[test]
    fn test_trailing_whitespace_collides_exactly() {
        // "PC " and "PC" must alias to the same identifier.
        assert_eq!(
            TableIdent::derive("PC ").unwrap(),
            TableIdent::derive("PC").unwrap()
        );
    }

    #[test]
    fn test_whitespace_runs_collapse_to_one_underscore() {
        assert_eq!(TableIdent::derive("desk   lamp").unwrap().as_str(), "desk_lamp");
        assert_eq!(TableIdent::derive("desk \t lamp").unwrap().as_str(), "desk_lamp");
    }

    #[test]
    fn test_invalid_names_rejected() {
        for name in ["a b!", "9lives", "", "   ", "naïve-name", "drop;table"] {
            let err = TableIdent::derive(name).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidIdentifier(_)),
                "expected InvalidIdentifier for {name:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_leading_underscore_is_valid() {
        assert_eq!(TableIdent::derive("_spares").unwrap().as_str(), "_spares");
        assert!(is_valid("_"));
    }

    #[test]
    fn test_checked_round_trips_persisted_idents() {
        assert!(TableIdent::checked("it_equipments").is_ok());
        assert!(TableIdent::checked("1bad").is_err());
        assert!(TableIdent::checked("bad name").is_err());
    }

    #[test]
    fn test_quoted() {
        assert_eq!(TableIdent::derive("PC").unwrap().quoted(), "\"pc\"");
    }
}
