//! Place authority records.

use serde::{Deserialize, Serialize};

use crate::{
  entity::{AuthorityEntity, Entity, EntityKind, fill_text},
  id::ScopedId,
  provider::{BoxFuture, Provider, ProviderResult},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
  #[serde(default)]
  pub ids:             Vec<ScopedId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub homepage:        Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub alternate_names: Vec<String>,
}

impl AuthorityEntity for Place {
  const KIND: EntityKind = EntityKind::Place;

  fn ids(&self) -> &[ScopedId] { &self.ids }

  fn ids_mut(&mut self) -> &mut Vec<ScopedId> { &mut self.ids }

  fn primary_name(&self) -> Option<String> {
    self.name.clone().filter(|n| !n.trim().is_empty())
  }

  fn alternate_names(&self) -> &[String] { &self.alternate_names }

  fn alternate_names_mut(&mut self) -> &mut Vec<String> {
    &mut self.alternate_names
  }

  fn merge_fields(&mut self, other: Self) {
    fill_text(&mut self.name, other.name);
    fill_text(&mut self.description, other.description);
    fill_text(&mut self.homepage, other.homepage);
  }

  fn into_entity(self) -> Entity { Entity::Place(self) }

  fn from_entity(entity: Entity) -> Option<Self> {
    match entity {
      Entity::Place(p) => Some(p),
      _ => None,
    }
  }

  fn suggest_from<'a>(
    provider: &'a dyn Provider,
    term: &'a str,
  ) -> BoxFuture<'a, ProviderResult<Vec<Self>>> {
    provider.suggest_place(term)
  }

  fn lookup_from<'a>(
    provider: &'a dyn Provider,
    id: &'a ScopedId,
  ) -> BoxFuture<'a, ProviderResult<Option<Self>>> {
    provider.lookup_place(id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::id::SchemeId;

  #[test]
  fn name_taken_only_when_missing() {
    let mut a = Place { name: None, ..Default::default() };
    a.merge(Place { name: Some("B".into()), ..Default::default() });
    assert_eq!(a.name.as_deref(), Some("B"));
    // The other's name became the primary name; it is not repeated as an
    // alternate.
    assert!(a.alternate_names.is_empty());

    let mut a = Place { name: Some("A".into()), ..Default::default() };
    a.merge(Place { name: Some("B".into()), ..Default::default() });
    assert_eq!(a.name.as_deref(), Some("A"));
    assert_eq!(a.alternate_names, vec!["B"]);
  }

  #[test]
  fn shared_id_is_same_in_either_direction() {
    let id = ScopedId::new(SchemeId::new("DNB"), "4005728-8");
    let a = Place { ids: vec![id.clone()], ..Default::default() };
    let b = Place {
      ids: vec![ScopedId::new(SchemeId::new("VIAF"), "1"), id],
      ..Default::default()
    };
    assert!(a.is_probably_same_as(&b));
    assert!(b.is_probably_same_as(&a));
  }
}
