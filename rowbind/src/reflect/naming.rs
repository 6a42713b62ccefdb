//! Naming conventions mapping Rust field identifiers to column names

use std::borrow::Cow;
use std::fmt;

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};

/// Maps a field identifier to the column name it is expected to match.
///
/// Fields carrying `#[rowbind(rename = "...")]` bypass the convention. With
/// [`NameConvention::Lowercase`] (the default) matching is case-insensitive:
/// both the stored names and the looked-up column names are lowercased.
/// Every other convention matches exactly.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameConvention {
    /// ASCII/Unicode lowercase of the identifier
    #[default]
    Lowercase,
    /// `snake_case` of the identifier (`userId` -> `user_id`)
    SnakeCase,
    /// The identifier as written
    Identity,
    /// A caller-provided function
    #[serde(skip)]
    Custom(fn(&str) -> String),
}

impl NameConvention {
    /// The external name of a field identifier.
    pub fn field_name(&self, ident: &str) -> String {
        let ident = ident.strip_prefix("r#").unwrap_or(ident);
        match self {
            NameConvention::Lowercase => ident.to_lowercase(),
            NameConvention::SnakeCase => ident.to_snake_case(),
            NameConvention::Identity => ident.to_string(),
            NameConvention::Custom(f) => f(ident),
        }
    }

    /// Normalize a name for comparison; only lowercase matching folds case.
    pub fn fold<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            NameConvention::Lowercase if name.chars().any(char::is_uppercase) => {
                Cow::Owned(name.to_lowercase())
            }
            _ => Cow::Borrowed(name),
        }
    }
}

impl fmt::Debug for NameConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameConvention::Lowercase => f.write_str("Lowercase"),
            NameConvention::SnakeCase => f.write_str("SnakeCase"),
            NameConvention::Identity => f.write_str("Identity"),
            NameConvention::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_is_default() {
        let convention = NameConvention::default();
        assert_eq!(convention.field_name("FirstName"), "firstname");
        assert_eq!(convention.fold("FirstName"), "firstname");
        assert!(matches!(convention.fold("id"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_snake_case_and_identity() {
        assert_eq!(NameConvention::SnakeCase.field_name("userId"), "user_id");
        assert_eq!(NameConvention::Identity.field_name("userId"), "userId");
        assert_eq!(NameConvention::Identity.fold("userId"), "userId");
    }

    #[test]
    fn test_raw_identifiers_are_unescaped() {
        assert_eq!(NameConvention::Lowercase.field_name("r#type"), "type");
    }

    #[test]
    fn test_custom_function() {
        fn upper(s: &str) -> String {
            s.to_uppercase()
        }
        assert_eq!(NameConvention::Custom(upper).field_name("name"), "NAME");
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            naming: NameConvention,
        }
        let w: Wrapper = toml::from_str(r#"naming = "snake_case""#).unwrap();
        assert!(matches!(w.naming, NameConvention::SnakeCase));
    }
}
