//! General identifiers for frames and other user-facing records.
//!
//! A [`GeneralId`] is either a non-negative integer or a string. Integer
//! ids are what operators type and pick; string ids are used for named,
//! tool-generated records. The integer `0` is the "default/origin"
//! sentinel and the empty string is never a valid id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier that is either a non-negative integer or a string.
///
/// Equality requires the same discriminant and the same value, so
/// `GeneralId::Int(1) != GeneralId::from("1")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneralId {
    /// Integer id. `0` is reserved for the default/origin frame.
    Int(u32),
    /// String id. Never empty when valid.
    Name(String),
}

impl GeneralId {
    /// The sentinel id (`0`) of the default/origin frame.
    #[must_use]
    pub const fn default_id() -> Self {
        Self::Int(0)
    }

    /// Whether this is the default/origin sentinel.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Int(0))
    }

    /// Integer ids are always valid; string ids must be non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Name(name) => !name.is_empty(),
        }
    }

    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    #[must_use]
    pub const fn is_name(&self) -> bool {
        matches!(self, Self::Name(_))
    }

    /// Integer value, if this is an integer id.
    #[must_use]
    pub const fn as_int(&self) -> Option<u32> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Name(_) => None,
        }
    }

    /// String value, if this is a string id.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Name(name) => Some(name),
        }
    }

    /// Display label: the decimal value for integers, the string itself
    /// otherwise.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Parse from a TOML value. Negative integers, non-integral values and
    /// empty strings yield `None`.
    #[must_use]
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Integer(i) => u32::try_from(*i).ok().map(Self::Int),
            toml::Value::String(s) if !s.is_empty() => Some(Self::Name(s.clone())),
            _ => None,
        }
    }

    /// Encode as a TOML value.
    #[must_use]
    pub fn to_toml(&self) -> toml::Value {
        match self {
            Self::Int(value) => toml::Value::Integer(i64::from(*value)),
            Self::Name(name) => toml::Value::String(name.clone()),
        }
    }
}

impl Default for GeneralId {
    fn default() -> Self {
        Self::default_id()
    }
}

impl fmt::Display for GeneralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u32> for GeneralId {
    fn from(value: u32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for GeneralId {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for GeneralId {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_string_ids_never_compare_equal() {
        assert_ne!(GeneralId::Int(1), GeneralId::from("1"));
        assert_eq!(GeneralId::Int(1), GeneralId::from(1));
        assert_eq!(GeneralId::from("grasp"), GeneralId::from("grasp".to_string()));
        assert_ne!(GeneralId::from("grasp"), GeneralId::from("Grasp"));
    }

    #[test]
    fn default_is_int_zero() {
        let id = GeneralId::default();
        assert!(id.is_default());
        assert!(id.is_int());
        assert_eq!(id, GeneralId::Int(0));
        assert!(!GeneralId::from("0").is_default());
    }

    #[test]
    fn validity() {
        assert!(GeneralId::Int(0).is_valid());
        assert!(GeneralId::from("tool").is_valid());
        assert!(!GeneralId::from("").is_valid());
    }

    #[test]
    fn labels() {
        assert_eq!(GeneralId::Int(5).label(), "5");
        assert_eq!(GeneralId::from("custom").label(), "custom");
    }

    #[test]
    fn toml_conversion() {
        assert_eq!(
            GeneralId::from_toml(&toml::Value::Integer(7)),
            Some(GeneralId::Int(7))
        );
        assert_eq!(
            GeneralId::from_toml(&toml::Value::String("tcp".into())),
            Some(GeneralId::from("tcp"))
        );
        assert_eq!(GeneralId::from_toml(&toml::Value::Integer(-1)), None);
        assert_eq!(GeneralId::from_toml(&toml::Value::String(String::new())), None);
        assert_eq!(GeneralId::from_toml(&toml::Value::Float(1.5)), None);

        assert_eq!(GeneralId::Int(3).to_toml(), toml::Value::Integer(3));
        assert_eq!(
            GeneralId::from("a").to_toml(),
            toml::Value::String("a".into())
        );
    }
}
