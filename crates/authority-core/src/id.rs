//! Scheme-qualified identifiers.
//!
//! A [`ScopedId`] names one record inside one identifier scheme, e.g.
//! `DNB:118540238`. The scheme part is always the canonical scheme id once an
//! id has been resolved through a [`SchemeRegistry`](crate::scheme::SchemeRegistry);
//! aliases and casing are only accepted on the way in.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Minimum length-ratio similarity (in percent) for two prefix-compatible id
/// values of the same scheme to count as the same record.
pub const PREFIX_SIMILARITY_THRESHOLD: f64 = 75.0;

// ─── SchemeId ────────────────────────────────────────────────────────────────

/// The canonical id of an identifier scheme (e.g. `DNB`, `VIAF`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemeId(String);

impl SchemeId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SchemeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── ScopedId ────────────────────────────────────────────────────────────────

/// An immutable `(scheme, value)` pair. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedId {
  scheme: SchemeId,
  value:  String,
}

impl ScopedId {
  pub fn new(scheme: SchemeId, value: impl Into<String>) -> Self {
    Self { scheme, value: value.into() }
  }

  /// Parse `"<scheme>:<value>"`, resolving the scheme part (case-insensitive,
  /// aliases allowed) against `schemes`.
  pub fn parse(
    s: &str,
    schemes: &crate::scheme::SchemeRegistry,
  ) -> Result<Self> {
    schemes.parse_id(s)
  }

  pub fn scheme(&self) -> &SchemeId { &self.scheme }

  pub fn value(&self) -> &str { &self.value }

  /// Whether `self` and `other` probably denote the same record: identical,
  /// or same scheme with prefix-compatible values whose length ratio reaches
  /// [`PREFIX_SIMILARITY_THRESHOLD`].
  pub fn is_probably_same_as(&self, other: &ScopedId) -> bool {
    if self == other {
      return true;
    }
    self.scheme == other.scheme
      && prefix_similarity(&self.value, &other.value)
        .is_some_and(|ratio| ratio >= PREFIX_SIMILARITY_THRESHOLD)
  }
}

/// Length-ratio similarity of two values in percent, or `None` when neither
/// value is a prefix of the other.
pub fn prefix_similarity(a: &str, b: &str) -> Option<f64> {
  if !(a.starts_with(b) || b.starts_with(a)) {
    return None;
  }
  let (la, lb) = (a.chars().count() as f64, b.chars().count() as f64);
  if la == 0.0 || lb == 0.0 {
    return None;
  }
  Some((la / lb).min(lb / la) * 100.0)
}

/// Whether two id lists intersect exactly.
pub fn ids_intersect(a: &[ScopedId], b: &[ScopedId]) -> bool {
  a.iter().any(|id| b.contains(id))
}

/// Whether any id of `a` probably names the same record as any id of `b`.
pub fn ids_probably_same(a: &[ScopedId], b: &[ScopedId]) -> bool {
  ids_intersect(a, b)
    || a
      .iter()
      .any(|x| b.iter().any(|y| x.is_probably_same_as(y)))
}

impl fmt::Display for ScopedId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.scheme, self.value)
  }
}

/// Splits an already-canonical `"<scheme>:<value>"` string without consulting
/// a scheme registry. Used when decoding stored values.
impl FromStr for ScopedId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.split_once(':') {
      Some((scheme, value)) if !scheme.is_empty() && !value.is_empty() => {
        Ok(Self::new(SchemeId::new(scheme), value))
      }
      _ => Err(Error::Parse(s.to_owned())),
    }
  }
}

impl Serialize for ScopedId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ScopedId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}
