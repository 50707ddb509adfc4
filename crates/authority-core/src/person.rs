//! Person authority records.

use serde::{Deserialize, Serialize};

use crate::{
  date::PartialDate,
  entity::{
    AuthorityEntity, Entity, EntityKind, fill, fill_text, merge_ref,
    merge_ref_list,
  },
  id::{ScopedId, ids_probably_same},
  place::Place,
  provider::{BoxFuture, Provider, ProviderResult},
};

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
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
  Male,
  Female,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
  #[serde(default)]
  pub ids:               Vec<ScopedId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender:            Option<Gender>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub family_name:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub given_name:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_birth:     Option<PartialDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_death:     Option<PartialDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_of_birth:    Option<Place>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_of_death:    Option<Place>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub place_of_activity: Vec<Place>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub alternate_names:   Vec<String>,
}

impl Person {
  /// `"family, given"`, or whichever part is known.
  pub fn display_name(&self) -> Option<String> {
    let family = self.family_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let given = self.given_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (family, given) {
      (Some(f), Some(g)) => Some(format!("{f}, {g}")),
      (Some(f), None) => Some(f.to_owned()),
      (None, Some(g)) => Some(g.to_owned()),
      (None, None) => None,
    }
  }

  /// Same family and given name (exact), compatible gender and compatible
  /// date of birth. Records without a family name never match this way.
  pub fn is_biographically_same_as(&self, other: &Person) -> bool {
    let named = self
      .family_name
      .as_deref()
      .is_some_and(|f| !f.is_empty());
    named
      && self.family_name == other.family_name
      && self.given_name == other.given_name
      && compatible(&self.gender, &other.gender)
      && compatible(&self.date_of_birth, &other.date_of_birth)
  }
}

fn compatible<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
  match (a, b) {
    (Some(a), Some(b)) => a == b,
    _ => true,
  }
}

impl AuthorityEntity for Person {
  const KIND: EntityKind = EntityKind::Person;

  fn ids(&self) -> &[ScopedId] { &self.ids }

  fn ids_mut(&mut self) -> &mut Vec<ScopedId> { &mut self.ids }

  fn primary_name(&self) -> Option<String> { self.display_name() }

  fn alternate_names(&self) -> &[String] { &self.alternate_names }

  fn alternate_names_mut(&mut self) -> &mut Vec<String> {
    &mut self.alternate_names
  }

  fn merge_fields(&mut self, other: Self) {
    fill(&mut self.gender, other.gender);
    fill_text(&mut self.description, other.description);
    fill_text(&mut self.family_name, other.family_name);
    fill_text(&mut self.given_name, other.given_name);
    fill(&mut self.date_of_birth, other.date_of_birth);
    fill(&mut self.date_of_death, other.date_of_death);
    merge_ref(&mut self.place_of_birth, other.place_of_birth);
    merge_ref(&mut self.place_of_death, other.place_of_death);
    merge_ref_list(&mut self.place_of_activity, other.place_of_activity);
  }

  fn is_probably_same_as(&self, other: &Self) -> bool {
    ids_probably_same(&self.ids, &other.ids) || self.is_biographically_same_as(other)
  }

  fn into_entity(self) -> Entity { Entity::Person(self) }

  fn from_entity(entity: Entity) -> Option<Self> {
    match entity {
      Entity::Person(p) => Some(p),
      _ => None,
    }
  }

  fn suggest_from<'a>(
    provider: &'a dyn Provider,
    term: &'a str,
  ) -> BoxFuture<'a, ProviderResult<Vec<Self>>> {
    provider.suggest_person(term)
  }

  fn lookup_from<'a>(
    provider: &'a dyn Provider,
    id: &'a ScopedId,
  ) -> BoxFuture<'a, ProviderResult<Option<Self>>> {
    provider.lookup_person(id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::id::SchemeId;

  fn id(scheme: &str, value: &str) -> ScopedId {
    ScopedId::new(SchemeId::new(scheme), value)
  }

  fn tester() -> Person {
    Person {
      family_name: Some("Tester".into()),
      given_name: Some("Susanne".into()),
      ..Default::default()
    }
  }

  #[test]
  fn receiver_keeps_its_scalars() {
    let mut a = Person { description: Some("A".into()), ..tester() };
    a.merge(Person { description: Some("B".into()), ..tester() });
    assert_eq!(a.description.as_deref(), Some("A"));

    let mut empty = Person { description: None, ..tester() };
    empty.merge(Person { description: Some("B".into()), ..tester() });
    assert_eq!(empty.description.as_deref(), Some("B"));
  }

  #[test]
  fn alternate_names_are_unioned_case_insensitively() {
    let mut receiver = Person {
      ids: vec![id("DNB", "1")],
      family_name: Some("Tester".into()),
      given_name: Some("S.".into()),
      alternate_names: vec!["Tester, S.".into()],
      ..Default::default()
    };
    let other = Person {
      ids: vec![id("DNB", "1")],
      alternate_names: vec!["TESTER, S.".into()],
      ..tester()
    };
    receiver.merge(other);

    let susanne = receiver
      .alternate_names
      .iter()
      .filter(|n| *n == "Tester, Susanne")
      .count();
    let short = receiver
      .alternate_names
      .iter()
      .filter(|n| n.eq_ignore_ascii_case("Tester, S."))
      .count();
    assert_eq!(susanne, 1);
    assert_eq!(short, 1);
  }

  #[test]
  fn merge_unions_ids_without_duplicates() {
    let mut a = Person { ids: vec![id("DNB", "1"), id("VIAF", "9")], ..tester() };
    a.merge(Person { ids: vec![id("VIAF", "9"), id("ORCID", "0")], ..tester() });
    assert_eq!(a.ids, vec![id("DNB", "1"), id("VIAF", "9"), id("ORCID", "0")]);
  }

  #[test]
  fn merging_twice_adds_nothing_new() {
    let other = Person {
      ids: vec![id("DNB", "2")],
      alternate_names: vec!["Testerin, Susi".into()],
      ..tester()
    };
    let mut a = Person { family_name: Some("T".into()), ..Default::default() };
    a.merge(other.clone());
    let once = a.clone();
    a.merge(other);
    assert_eq!(a, once);
  }

  #[test]
  fn biographical_identity_matches_without_ids() {
    let a = Person {
      gender: Some(Gender::Female),
      date_of_birth: Some(PartialDate::Year(1950)),
      ..tester()
    };
    let b = Person { ids: vec![id("VIAF", "1")], ..tester() };
    assert!(a.is_probably_same_as(&b));

    let c = Person { gender: Some(Gender::Male), ..tester() };
    assert!(!a.is_probably_same_as(&c));

    let d = Person { date_of_birth: Some(PartialDate::Year(1951)), ..tester() };
    assert!(!a.is_probably_same_as(&d));

    let lower = Person { family_name: Some("tester".into()), ..tester() };
    assert!(!a.is_probably_same_as(&lower));
  }

  #[test]
  fn nameless_persons_never_match_biographically() {
    assert!(!Person::default().is_probably_same_as(&Person::default()));
  }

  #[test]
  fn place_of_birth_is_filled_from_other() {
    let berlin = Place {
      ids: vec![id("DNB", "4005728-8")],
      name: Some("Berlin".into()),
      ..Default::default()
    };
    let mut a = tester();
    a.merge(Person { place_of_birth: Some(berlin.clone()), ..tester() });
    assert_eq!(a.place_of_birth, Some(berlin));
  }

  #[test]
  fn gender_parses_from_lowercase() {
    assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
    assert_eq!(Gender::Male.to_string(), "male");
  }
}
