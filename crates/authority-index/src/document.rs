//! The document model of the index: flat lists of named text fields, exact
//! terms and the small query language understood by the store.

use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// Field carrying the entity type name of a document.
pub const OBJECT_TYPE_FIELD: &str = "objectType";

// ─── Fields ──────────────────────────────────────────────────────────────────

/// How a field is kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFlags {
  /// Returned when the document is loaded.
  pub stored:   bool,
  /// Tokenised for free-text matching, in addition to exact term matching.
  pub analyzed: bool,
}

impl FieldFlags {
  /// Stored, matched only as an exact term (ids, dates, keys).
  pub const KEYWORD: Self = Self { stored: true, analyzed: false };
  /// Stored and tokenised (names, descriptions).
  pub const TEXT: Self = Self { stored: true, analyzed: true };
  /// Tokenised for search but never returned.
  pub const SEARCH_ONLY: Self = Self { stored: false, analyzed: true };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  pub name:  String,
  pub value: String,
  pub flags: FieldFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
  pub fields: Vec<Field>,
}

impl Document {
  pub fn new() -> Self { Self::default() }

  pub fn push(
    &mut self,
    name: impl Into<String>,
    value: impl Into<String>,
    flags: FieldFlags,
  ) {
    self.fields.push(Field { name: name.into(), value: value.into(), flags });
  }

  /// All values of `name`, in document order.
  pub fn values(&self, name: &str) -> Vec<String> {
    self
      .fields
      .iter()
      .filter(|f| f.name == name)
      .map(|f| f.value.clone())
      .collect()
  }

  pub fn first(&self, name: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(|f| f.value.as_str())
  }

  pub fn object_type(&self) -> Option<&str> { self.first(OBJECT_TYPE_FIELD) }
}

/// Lower-cased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
    .map(str::to_lowercase)
    .collect()
}

// ─── Terms ───────────────────────────────────────────────────────────────────

/// An exact `(field, value)` pair, written `field:value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
  pub field: String,
  pub value: String,
}

impl Term {
  pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
    Self { field: field.into(), value: value.into() }
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.field, self.value)
  }
}

/// Splits at the first `:`; the value may contain further colons.
impl FromStr for Term {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.split_once(':') {
      Some((field, value)) if !field.is_empty() && !value.is_empty() => {
        Ok(Self::new(field, value))
      }
      _ => Err(Error::Mapping(format!("malformed term {s:?}"))),
    }
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// A predicate over documents. Results are ranked by the number of matching
/// clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
  /// The field holds exactly this value.
  Term(Term),
  /// Some token of `text` is a prefix of a token of the analyzed field.
  Text { field: String, text: String },
  /// At least one sub-query matches.
  Any(Vec<Query>),
  /// Every sub-query matches.
  All(Vec<Query>),
}

impl Query {
  /// Parse `field:value` into a term query.
  pub fn parse(s: &str) -> Result<Self> { s.parse::<Term>().map(Self::Term) }

  pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
    Self::Term(Term::new(field, value))
  }

  pub fn text(field: impl Into<String>, text: impl Into<String>) -> Self {
    Self::Text { field: field.into(), text: text.into() }
  }
}

impl From<Term> for Query {
  fn from(term: Term) -> Self { Self::Term(term) }
}
