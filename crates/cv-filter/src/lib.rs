//! Filter expressions over a single attribute.
//!
//! Predicates are kept as structured equality clauses and only rendered to a
//! where-clause string at the edge, with values quoted as SQL string literals.

use cv_api_types::{AttributeValue, Feature};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Value of the synthetic "no restriction" choice appended to every combobox.
pub const SHOW_ALL_VALUE: &str = "Show_All";
pub const SHOW_ALL_LABEL: &str = "Show All";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("field name is empty")]
    EmptyField,
    #[error("`{0}` is not a valid field name")]
    InvalidField(String),
}

/// An attribute name that is safe to splice into a where clause: one or more
/// dot-separated identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldName(String);

impl FieldName {
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FilterError::EmptyField);
        }

        let valid = trimmed.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        });

        if !valid {
            return Err(FilterError::InvalidField(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quote `value` as a SQL string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityClause {
    field: FieldName,
    value: String,
}

impl EqualityClause {
    pub fn new(field: &FieldName, value: impl Into<String>) -> Self {
        Self {
            field: field.clone(),
            value: value.into(),
        }
    }

    pub fn to_where(&self) -> String {
        format!("{} = {}", self.field, quote_literal(&self.value))
    }

    fn matches(&self, feature: &Feature) -> bool {
        feature
            .attribute(self.field.as_str())
            .and_then(AttributeValue::as_choice)
            .is_some_and(|choice| choice == self.value)
    }
}

/// Disjunction of equality clauses. No clauses means "match all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<EqualityClause>,
}

impl Predicate {
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn equals(field: &FieldName, value: impl Into<String>) -> Self {
        Self::match_all().or(EqualityClause::new(field, value))
    }

    pub fn or(mut self, clause: EqualityClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render as a where clause. Match-all renders as the empty string.
    pub fn to_where(&self) -> String {
        self.clauses
            .iter()
            .map(EqualityClause::to_where)
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        self.is_match_all() || self.clauses.iter().any(|clause| clause.matches(feature))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_where())
    }
}

/// True when a combobox selection restricts the layer.
pub fn is_restricting(selection: Option<&str>) -> bool {
    matches!(selection, Some(value) if !value.is_empty() && value != SHOW_ALL_VALUE)
}

/// Combine the first selection of each combobox into one predicate.
///
/// Absent, empty, and "Show All" selections contribute nothing; when neither
/// restricts, the result matches all features.
pub fn selection_predicate(field: &FieldName, first: Option<&str>, second: Option<&str>) -> Predicate {
    [first, second]
        .into_iter()
        .filter(|selection| is_restricting(*selection))
        .flatten()
        .fold(Predicate::match_all(), |predicate, value| {
            predicate.or(EqualityClause::new(field, value))
        })
}

/// Unique, non-empty values of one attribute in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DistinctValueSet {
    values: Vec<String>,
    seen: HashSet<String>,
}

impl DistinctValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_features<'a, I>(field: &FieldName, features: I) -> Self
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        let mut set = Self::new();
        for feature in features {
            if let Some(value) = feature.attribute(field.as_str()) {
                set.insert(value);
            }
        }
        set
    }

    /// Returns whether the value was new. Null, empty, and the sentinel value
    /// itself are never recorded.
    pub fn insert(&mut self, value: &AttributeValue) -> bool {
        let Some(choice) = value.as_choice() else {
            return false;
        };
        if choice == SHOW_ALL_VALUE || self.seen.contains(&choice) {
            return false;
        }
        self.seen.insert(choice.clone());
        self.values.push(choice);
        true
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
