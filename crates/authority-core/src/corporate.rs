//! Corporate body authority records.

use serde::{Deserialize, Serialize};

use crate::{
  date::PartialDate,
  entity::{AuthorityEntity, Entity, EntityKind, fill, fill_text, merge_ref},
  id::ScopedId,
  place::Place,
  provider::{BoxFuture, Provider, ProviderResult},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corporate {
  #[serde(default)]
  pub ids:                   Vec<ScopedId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:                  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_establishment: Option<PartialDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_termination:   Option<PartialDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub homepage:              Option<String>,
  /// The superior body. Held by value here; the index stores it by key.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent:                Option<Box<Corporate>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place:                 Option<Place>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub alternate_names:       Vec<String>,
}

impl AuthorityEntity for Corporate {
  const KIND: EntityKind = EntityKind::Corporate;

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
    fill(&mut self.date_of_establishment, other.date_of_establishment);
    fill(&mut self.date_of_termination, other.date_of_termination);
    fill_text(&mut self.homepage, other.homepage);
    if let Some(parent) = other.parent {
      match &mut self.parent {
        Some(own) if own.is_probably_same_as(&parent) => own.merge(*parent),
        Some(_) => {}
        None => self.parent = Some(parent),
      }
    }
    merge_ref(&mut self.place, other.place);
  }

  fn into_entity(self) -> Entity { Entity::Corporate(self) }

  fn from_entity(entity: Entity) -> Option<Self> {
    match entity {
      Entity::Corporate(c) => Some(c),
      _ => None,
    }
  }

  fn suggest_from<'a>(
    provider: &'a dyn Provider,
    term: &'a str,
  ) -> BoxFuture<'a, ProviderResult<Vec<Self>>> {
    provider.suggest_corporate(term)
  }

  fn lookup_from<'a>(
    provider: &'a dyn Provider,
    id: &'a ScopedId,
  ) -> BoxFuture<'a, ProviderResult<Option<Self>>> {
    provider.lookup_corporate(id)
  }
}
