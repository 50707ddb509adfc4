//! Conversion between entities and index documents.
//!
//! References between entities are stored as key terms. Reading a document
//! back resolves each key with a lookup against the same snapshot, within a
//! bounded depth, so cyclic parent chains always terminate.

use std::collections::HashSet;

use authority_core::{
  corporate::Corporate,
  entity::{AuthorityEntity, Entity, EntityKind},
  person::Person,
  place::Place,
};
use tracing::debug;

use crate::{
  Error, Result,
  descriptor::{Describe, IDS, field_name},
  document::{Document, FieldFlags, OBJECT_TYPE_FIELD, Term},
};

/// How many reference hops [`to_entity`] follows before leaving references
/// empty.
pub const MAX_REFERENCE_DEPTH: usize = 3;

/// Synchronous key lookup against one consistent view of the store.
pub trait KeyLookup {
  fn lookup(&self, key: &Term) -> Result<Option<Document>>;
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The first value of the first id field, in document order.
pub fn key_term_of<E: Describe>(entity: &E) -> Result<Term> {
  E::fields()
    .iter()
    .filter(|d| d.id_field)
    .find_map(|d| {
      (d.encode)(entity)
        .into_iter()
        .next()
        .map(|value| Term::new(field_name(E::KIND, d.name), value))
    })
    .ok_or_else(|| {
      Error::Mapping(format!("{} without ids has no document key", E::KIND))
    })
}

pub fn key_term(entity: &Entity) -> Result<Term> {
  match entity {
    Entity::Person(p) => key_term_of(p),
    Entity::Corporate(c) => key_term_of(c),
    Entity::Place(p) => key_term_of(p),
  }
}

/// The term matching any document of `kind` that carries `id_value` as an id.
pub fn id_term(kind: EntityKind, id_value: impl Into<String>) -> Term {
  Term::new(field_name(kind, IDS), id_value)
}

// ─── Entity → document ───────────────────────────────────────────────────────

pub fn to_document_of<E: Describe>(entity: &E) -> Document {
  let mut doc = Document::new();
  doc.push(OBJECT_TYPE_FIELD, E::KIND.type_name(), FieldFlags::KEYWORD);

  for d in E::fields() {
    for value in (d.encode)(entity) {
      doc.push(field_name(E::KIND, d.name), value, d.flags);
    }
  }

  for r in E::refs() {
    for target in (r.collect)(entity) {
      match key_term(&target) {
        Ok(key) => doc.push(field_name(E::KIND, r.name), key.to_string(), FieldFlags::KEYWORD),
        Err(_) => debug!(
          field = r.name,
          "skipping reference to {} without ids",
          target.kind()
        ),
      }
    }
  }
  doc
}

pub fn to_document(entity: &Entity) -> Document {
  match entity {
    Entity::Person(p) => to_document_of(p),
    Entity::Corporate(c) => to_document_of(c),
    Entity::Place(p) => to_document_of(p),
  }
}

// ─── Document → entity ───────────────────────────────────────────────────────

/// Rebuild a fresh entity from `doc`, resolving references through
/// `lookup`. A reference whose key is no longer stored stays empty.
pub fn to_entity(doc: &Document, lookup: &dyn KeyLookup) -> Result<Entity> {
  decode_entity(doc, lookup, MAX_REFERENCE_DEPTH)
}

fn decode_entity(
  doc: &Document,
  lookup: &dyn KeyLookup,
  depth: usize,
) -> Result<Entity> {
  let type_name = doc
    .object_type()
    .ok_or_else(|| Error::Mapping("document has no objectType field".into()))?;
  let kind: EntityKind = type_name
    .parse()
    .map_err(|_| Error::Mapping(format!("unknown objectType {type_name:?}")))?;

  Ok(match kind {
    EntityKind::Person => decode_of::<Person>(doc, lookup, depth)?.into_entity(),
    EntityKind::Corporate => decode_of::<Corporate>(doc, lookup, depth)?.into_entity(),
    EntityKind::Place => decode_of::<Place>(doc, lookup, depth)?.into_entity(),
  })
}

fn decode_of<E: Describe>(
  doc: &Document,
  lookup: &dyn KeyLookup,
  depth: usize,
) -> Result<E> {
  let mut entity = E::default();

  for d in E::fields() {
    let Some(decode) = d.decode else { continue };
    let values = doc.values(&field_name(E::KIND, d.name));
    if !values.is_empty() {
      decode(&mut entity, values)?;
    }
  }

  if depth == 0 {
    return Ok(entity);
  }

  for r in E::refs() {
    let expected_field = field_name(r.target, IDS);
    let mut resolved = Vec::new();
    for raw in doc.values(&field_name(E::KIND, r.name)) {
      let key: Term = raw.parse()?;
      if key.field != expected_field {
        return Err(Error::Mapping(format!(
          "{}.{} holds key {raw:?}, expected a {} key",
          E::KIND,
          r.name,
          r.target
        )));
      }
      match lookup.lookup(&key)? {
        Some(target) => resolved.push(decode_entity(&target, lookup, depth - 1)?),
        None => debug!(%key, "dangling reference left empty"),
      }
    }
    if !resolved.is_empty() {
      (r.attach)(&mut entity, resolved)?;
    }
  }
  Ok(entity)
}

// ─── Referenced entities ─────────────────────────────────────────────────────

fn direct_refs_of<E: Describe>(entity: &E) -> Vec<Entity> {
  E::refs().iter().flat_map(|r| (r.collect)(entity)).collect()
}

fn direct_refs(entity: &Entity) -> Vec<Entity> {
  match entity {
    Entity::Person(p) => direct_refs_of(p),
    Entity::Corporate(c) => direct_refs_of(c),
    Entity::Place(p) => direct_refs_of(p),
  }
}

/// Every entity reachable through references, deduplicated by key and
/// ordered so that each entity comes after the ones it references.
/// Referenced entities without ids cannot be stored and are skipped.
pub fn referenced_entities(entity: &Entity) -> Vec<Entity> {
  let mut seen = HashSet::new();
  if let Ok(key) = key_term(entity) {
    seen.insert(key);
  }
  let mut out = Vec::new();
  collect_refs(entity, &mut seen, &mut out);
  out
}

fn collect_refs(entity: &Entity, seen: &mut HashSet<Term>, out: &mut Vec<Entity>) {
  for target in direct_refs(entity) {
    let Ok(key) = key_term(&target) else { continue };
    if seen.insert(key) {
      collect_refs(&target, seen, out);
      out.push(target);
    }
  }
}
