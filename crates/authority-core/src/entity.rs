//! The mergeable entity supertype.
//!
//! Every concrete authority record ([`Person`], [`Corporate`], [`Place`])
//! carries a list of [`ScopedId`]s and knows how to absorb another record of
//! the same type. Merging is asymmetric: the receiver keeps every scalar it
//! already has and only fills gaps from the other side, while ids and
//! alternate names are unioned without duplicates.

use serde::{Deserialize, Serialize};

use crate::{
  corporate::Corporate,
  id::{ScopedId, ids_probably_same},
  person::Person,
  place::Place,
  provider::{BoxFuture, Provider, ProviderResult},
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The concrete entity types known to the system. `Display` yields the type
/// name used as index field prefix (`Person`, `Corporate`, `Place`).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum EntityKind {
  Person,
  Corporate,
  Place,
}

impl EntityKind {
  pub fn type_name(self) -> &'static str { self.into() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Behaviour shared by all concrete authority records.
///
/// The two `*_from` functions dispatch to the matching provider capability so
/// generic code (the aggregator, the index provider) can stay typed.
pub trait AuthorityEntity:
  Clone + std::fmt::Debug + Send + Sync + Sized + 'static
{
  const KIND: EntityKind;

  fn ids(&self) -> &[ScopedId];

  fn ids_mut(&mut self) -> &mut Vec<ScopedId>;

  /// The name this record is primarily known by, if any.
  fn primary_name(&self) -> Option<String>;

  fn alternate_names(&self) -> &[String];

  fn alternate_names_mut(&mut self) -> &mut Vec<String>;

  /// Fill the receiver's empty type-specific fields from `other`.
  fn merge_fields(&mut self, other: Self);

  /// Absorb `other` into `self`. Never fails; absent fields are skipped.
  fn merge(&mut self, mut other: Self) {
    let other_primary = other.primary_name();
    let other_alternates = std::mem::take(other.alternate_names_mut());
    let other_ids = std::mem::take(other.ids_mut());

    self.merge_fields(other);

    for id in other_ids {
      push_unique_id(self.ids_mut(), id);
    }
    let own_primary = self.primary_name();
    for name in other_primary.into_iter().chain(other_alternates) {
      add_alternate_name(own_primary.as_deref(), self.alternate_names_mut(), name);
    }
  }

  fn is_probably_same_as(&self, other: &Self) -> bool {
    ids_probably_same(self.ids(), other.ids())
  }

  fn into_entity(self) -> Entity;

  fn from_entity(entity: Entity) -> Option<Self>;

  fn suggest_from<'a>(
    provider: &'a dyn Provider,
    term: &'a str,
  ) -> BoxFuture<'a, ProviderResult<Vec<Self>>>;

  fn lookup_from<'a>(
    provider: &'a dyn Provider,
    id: &'a ScopedId,
  ) -> BoxFuture<'a, ProviderResult<Option<Self>>>;
}

// ─── Merge helpers ───────────────────────────────────────────────────────────

/// Append `id` unless the exact `(scheme, value)` pair is already present.
pub fn push_unique_id(ids: &mut Vec<ScopedId>, id: ScopedId) {
  if !ids.contains(&id) {
    ids.push(id);
  }
}

/// Add `name` as an alternate unless it matches, case-insensitively, the
/// primary name or any existing alternate.
pub fn add_alternate_name(
  primary: Option<&str>,
  alternates: &mut Vec<String>,
  name: String,
) {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return;
  }
  let folded = trimmed.to_lowercase();
  let known = primary
    .into_iter()
    .chain(alternates.iter().map(String::as_str))
    .any(|existing| existing.trim().to_lowercase() == folded);
  if !known {
    alternates.push(trimmed.to_owned());
  }
}

/// Take `other` only when the receiver's text is absent or blank.
pub fn fill_text(slot: &mut Option<String>, other: Option<String>) {
  let empty = slot.as_deref().is_none_or(|s| s.trim().is_empty());
  if empty {
    if let Some(value) = other.filter(|v| !v.trim().is_empty()) {
      *slot = Some(value);
    }
  }
}

/// Take `other` only when the receiver has no value.
pub fn fill<T>(slot: &mut Option<T>, other: Option<T>) {
  if slot.is_none() {
    *slot = other;
  }
}

/// Fill a single reference, or fold `other` into it when both sides point at
/// the same record.
pub fn merge_ref<E: AuthorityEntity>(slot: &mut Option<E>, other: Option<E>) {
  let Some(other) = other else { return };
  match slot {
    Some(own) if own.is_probably_same_as(&other) => own.merge(other),
    Some(_) => {}
    None => *slot = Some(other),
  }
}

/// Take the other list when the receiver's is empty; otherwise append the
/// records that share no identity with an existing one.
pub fn merge_ref_list<E: AuthorityEntity>(own: &mut Vec<E>, other: Vec<E>) {
  if own.is_empty() {
    *own = other;
    return;
  }
  for item in other {
    match own.iter_mut().find(|o| o.is_probably_same_as(&item)) {
      Some(existing) => existing.merge(item),
      None => own.push(item),
    }
  }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A type-erased authority record, used where the concrete type is only known
/// at runtime (events, the index mapper, HTTP responses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
  Person(Person),
  Corporate(Corporate),
  Place(Place),
}

impl Entity {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Person(_) => EntityKind::Person,
      Self::Corporate(_) => EntityKind::Corporate,
      Self::Place(_) => EntityKind::Place,
    }
  }

  pub fn ids(&self) -> &[ScopedId] {
    match self {
      Self::Person(p) => p.ids(),
      Self::Corporate(c) => c.ids(),
      Self::Place(p) => p.ids(),
    }
  }

  pub fn primary_name(&self) -> Option<String> {
    match self {
      Self::Person(p) => p.primary_name(),
      Self::Corporate(c) => c.primary_name(),
      Self::Place(p) => p.primary_name(),
    }
  }
}

impl From<Person> for Entity {
  fn from(p: Person) -> Self { Self::Person(p) }
}

impl From<Corporate> for Entity {
  fn from(c: Corporate) -> Self { Self::Corporate(c) }
}

impl From<Place> for Entity {
  fn from(p: Place) -> Self { Self::Place(p) }
}
