//! Shared primitive types for medrep.
//!
//! These types sit underneath both the entity model (`records`) and the reporting engine
//! (`medrep-core`) so that identifiers and validated text mean the same thing everywhere.

use std::{fmt, str::FromStr};

pub use uuid::Uuid;

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input was not a canonical entity identifier
    #[error("entity id must be 32 lowercase hex characters without hyphens, got: '{0}'")]
    InvalidId(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Opaque, immutable identifier of a stored entity.
///
/// Identifiers are rendered in canonical form: 32 lowercase hexadecimal characters with no
/// hyphens (the `simple` UUID form). [`EntityId::parse`] only accepts that form so the same
/// entity never shows up under two spellings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityId {
    /// Allocates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds a deterministic identifier, mostly useful for fixtures.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses an identifier that must already be in canonical form.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        if !Self::is_canonical(input) {
            return Err(TextError::InvalidId(input.to_owned()));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| TextError::InvalidId(input.to_owned()))
    }

    /// Returns true if `input` is 32 lowercase hex characters.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32 && input.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for EntityId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntityId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        let text = NonEmptyText::new("  Cardiology ").expect("valid text");
        assert_eq!(text.as_str(), "Cardiology");

        let err = NonEmptyText::new("   ").expect_err("blank text should fail");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn entity_id_displays_canonical_form() {
        let id = EntityId::from_u128(0x2a);
        assert_eq!(id.to_string(), "0000000000000000000000000000002a");
        assert_eq!(EntityId::parse(&id.to_string()).expect("parse"), id);
    }

    #[test]
    fn entity_id_rejects_hyphenated_and_uppercase() {
        let hyphenated = "550e8400-e29b-41d4-a716-446655440000";
        assert!(matches!(
            EntityId::parse(hyphenated),
            Err(TextError::InvalidId(_))
        ));
        assert!(EntityId::parse("550E8400E29B41D4A716446655440000").is_err());
    }

    #[test]
    fn entity_id_serde_uses_string_form() {
        let id = EntityId::from_u128(7);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"00000000000000000000000000000007\"");
        let back: EntityId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
