//! URL-safe store identifiers derived from display names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A URL-safe, human-readable identifier derived from a store name.
///
/// Derivation lowercases the name, maps runs of non-alphanumeric characters
/// to single hyphens, and trims leading/trailing hyphens. Collisions with
/// existing slugs are disambiguated with a numeric suffix; see
/// [`Slug::unique_among`].
///
/// ```
/// use tastetrail_core::Slug;
///
/// assert_eq!(Slug::derive("Cafe Luna").as_str(), "cafe-luna");
/// assert_eq!(Slug::derive("  Joe's  Diner! ").as_str(), "joe-s-diner");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name.
    ///
    /// A name with no alphanumeric characters derives the empty slug;
    /// callers are expected to reject empty names before deriving.
    #[must_use]
    pub fn derive(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.extend(c.to_lowercase());
            } else {
                pending_hyphen = true;
            }
        }

        Self(slug)
    }

    /// Derive a slug from `name`, disambiguated against `existing` slugs.
    ///
    /// `existing` is the full candidate set the storage layer found for this
    /// base (typically via a prefix query). Only slugs in the same family
    /// (`base` or `base-<digits>`, case-insensitive) count as conflicts; if
    /// there are `n` of them the result is `base-<n + 1>`.
    #[must_use]
    pub fn unique_among<S: AsRef<str>>(name: &str, existing: &[S]) -> Self {
        let base = Self::derive(name);
        let conflicts = existing
            .iter()
            .filter(|s| base.is_family_member(s.as_ref()))
            .count();

        if conflicts == 0 {
            base
        } else {
            Self(format!("{}-{}", base.0, conflicts + 1))
        }
    }

    /// Whether `candidate` belongs to this slug's collision family:
    /// the base itself or the base followed by `-` and zero or more digits,
    /// compared case-insensitively.
    #[must_use]
    pub fn is_family_member(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        let Some(rest) = candidate.strip_prefix(&self.0) else {
            return false;
        };
        match rest.strip_prefix('-') {
            None => rest.is_empty(),
            Some(digits) => digits.chars().all(|c| c.is_ascii_digit()),
        }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the slug is empty (name had no alphanumeric characters).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_basic() {
        assert_eq!(Slug::derive("Cafe Luna").as_str(), "cafe-luna");
        assert_eq!(Slug::derive("The Best BBQ").as_str(), "the-best-bbq");
    }

    #[test]
    fn test_derive_collapses_punctuation() {
        assert_eq!(Slug::derive("Joe's  Diner!").as_str(), "joe-s-diner");
        assert_eq!(Slug::derive("--Fish & Chips--").as_str(), "fish-chips");
    }

    #[test]
    fn test_derive_no_alphanumerics() {
        assert!(Slug::derive("???").is_empty());
    }

    #[test]
    fn test_family_member() {
        let base = Slug::derive("Cafe Luna");
        assert!(base.is_family_member("cafe-luna"));
        assert!(base.is_family_member("CAFE-LUNA"));
        assert!(base.is_family_member("cafe-luna-2"));
        assert!(base.is_family_member("cafe-luna-17"));
        // Bare trailing hyphen counts (zero digits)
        assert!(base.is_family_member("cafe-luna-"));
        assert!(!base.is_family_member("cafe-lunar"));
        assert!(!base.is_family_member("cafe-luna-2x"));
        assert!(!base.is_family_member("cafe"));
    }

    #[test]
    fn test_unique_among_no_conflict() {
        let existing: [&str; 0] = [];
        assert_eq!(Slug::unique_among("Cafe Luna", &existing).as_str(), "cafe-luna");
    }

    #[test]
    fn test_unique_among_single_conflict() {
        let slug = Slug::unique_among("Cafe Luna", &["cafe-luna"]);
        assert_eq!(slug.as_str(), "cafe-luna-2");
    }

    #[test]
    fn test_unique_among_ignores_other_families() {
        let slug = Slug::unique_among("Cafe Luna", &["cafe-lunar", "cafe-luna-x"]);
        assert_eq!(slug.as_str(), "cafe-luna");
    }

    #[test]
    fn test_repeated_creations_stay_distinct() {
        // Simulates creating the same-named store repeatedly: every derived
        // slug must be new and match base or base-<digits>.
        let mut existing: Vec<String> = Vec::new();
        for _ in 0..6 {
            let slug = Slug::unique_among("Cafe Luna", &existing);
            assert!(!existing.iter().any(|s| s == slug.as_str()));
            assert!(Slug::derive("Cafe Luna").is_family_member(slug.as_str()));
            existing.push(slug.into_inner());
        }
    }
}
