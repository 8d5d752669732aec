//! Record, query and update-set mappings.
//!
//! # Responsibility
//! - Represent one shelter animal as a flat field-to-scalar mapping.
//! - Provide type-aware equality used by filters and local table patches.
//!
//! # Invariants
//! - Integers and floats compare numerically with each other.
//! - `Null` matches a null or missing field.
//! - Merging an update set only touches the listed fields.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Store-generated identifier field. Never returned by reads.
pub const ID_FIELD: &str = "_id";
/// Preferred logical key for updates issued by the dashboard.
pub const ANIMAL_ID_FIELD: &str = "animal_id";
/// Fallback logical key when `animal_id` is absent.
pub const NAME_FIELD: &str = "name";
pub const ANIMAL_TYPE_FIELD: &str = "animal_type";
pub const BREED_FIELD: &str = "breed";
pub const LATITUDE_FIELD: &str = "location_lat";
pub const LONGITUDE_FIELD: &str = "location_long";

/// Scalar value stored in a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value; text is parsed after trimming.
    ///
    /// Returns `None` for non-finite results so callers can fall back.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Integer(value) => *value as f64,
            Self::Float(value) => *value,
            Self::Text(value) => value.trim().parse::<f64>().ok()?,
            Self::Null | Self::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Type-aware equality used by queries.
    pub fn matches(&self, expected: &FieldValue) -> bool {
        match (self, expected) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Text(left), Self::Text(right)) => left == right,
            (Self::Integer(left), Self::Integer(right)) => left == right,
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                self.as_number() == expected.as_number() && self.as_number().is_some()
            }
            _ => false,
        }
    }

    /// Total order used for table sorting: null, bool, number, text.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                let left = self.as_number().unwrap_or(f64::NAN);
                let right = other.as_number().unwrap_or(f64::NAN);
                left.partial_cmp(&right).unwrap_or(Ordering::Equal)
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Converts edited text back to this value's type when it parses as it.
    pub fn coerce_text(&self, text: &str) -> FieldValue {
        match self {
            Self::Integer(_) => text
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .unwrap_or_else(|_| Self::Text(text.to_string())),
            Self::Float(_) => match text.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Self::Float(value),
                _ => Self::Text(text.to_string()),
            },
            Self::Bool(_) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Self::Bool(true),
                "false" => Self::Bool(false),
                _ => Self::Text(text.to_string()),
            },
            Self::Null if text.is_empty() => Self::Null,
            Self::Null | Self::Text(_) => Self::Text(text.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! field_map {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(BTreeMap<String, FieldValue>);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Builder-style insert.
            pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
                self.0.insert(field.into(), value.into());
                self
            }

            pub fn insert(
                &mut self,
                field: impl Into<String>,
                value: impl Into<FieldValue>,
            ) -> Option<FieldValue> {
                self.0.insert(field.into(), value.into())
            }

            pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
                self.0.remove(field)
            }

            pub fn get(&self, field: &str) -> Option<&FieldValue> {
                self.0.get(field)
            }

            pub fn contains_field(&self, field: &str) -> bool {
                self.0.contains_key(field)
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn fields(&self) -> impl Iterator<Item = &str> {
                self.0.keys().map(String::as_str)
            }

            pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
                self.0.iter()
            }
        }

        impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for $name {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                Self(
                    iter.into_iter()
                        .map(|(field, value)| (field.into(), value.into()))
                        .collect(),
                )
            }
        }

        impl IntoIterator for $name {
            type Item = (String, FieldValue);
            type IntoIter = btree_map::IntoIter<String, FieldValue>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = (&'a String, &'a FieldValue);
            type IntoIter = btree_map::Iter<'a, String, FieldValue>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

field_map!(
    /// One shelter animal: a flat mapping of field name to scalar value.
    Record
);
field_map!(
    /// Equality filter. An empty query matches every record.
    Query
);
field_map!(
    /// Fields merged into matching records; unlisted fields are preserved.
    UpdateSet
);

impl Record {
    /// Returns whether every query field equals this record's value.
    pub fn matches(&self, query: &Query) -> bool {
        query.iter().all(|(field, expected)| match self.get(field) {
            Some(actual) => actual.matches(expected),
            None => expected.is_null(),
        })
    }

    /// Merges `update` into this record and reports whether anything changed.
    pub fn merge(&mut self, update: &UpdateSet) -> bool {
        let mut changed = false;
        for (field, value) in update {
            if self.get(field) != Some(value) {
                self.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// Display text of a non-null field.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field)
            .filter(|value| !value.is_null())
            .map(ToString::to_string)
    }

    /// Builds the logical-key query: `animal_id` when present, else `name`.
    pub fn identity_query(&self) -> Option<Query> {
        [ANIMAL_ID_FIELD, NAME_FIELD].iter().find_map(|field| {
            self.get(field)
                .filter(|value| !value.is_null())
                .map(|value| Query::new().with(*field, value.clone()))
        })
    }
}
