//! Static field and reference descriptors per entity type.
//!
//! A descriptor table lists, in document order, every field an entity emits
//! together with its storage flags and codec. Reference descriptors list the
//! fields that point at other entities; those are stored as key terms and
//! resolved by lookup when a document is read back.

use authority_core::{
  corporate::Corporate,
  entity::{AuthorityEntity, Entity, EntityKind},
  person::Person,
  place::Place,
};

use crate::{Error, Result, codec, document::FieldFlags};

/// Unprefixed name of the id field every entity type has.
pub const IDS: &str = "mappedIds";

pub type Encode<E> = fn(&E) -> Vec<String>;
pub type Decode<E> = fn(&mut E, Vec<String>) -> Result<()>;

pub struct FieldDescriptor<E> {
  /// Field name without the type prefix.
  pub name:     &'static str,
  pub flags:    FieldFlags,
  /// Values of id fields are eligible as the document key.
  pub id_field: bool,
  pub encode:   Encode<E>,
  /// `None` for derived fields that are only searched, never read back.
  pub decode:   Option<Decode<E>>,
}

pub struct RefDescriptor<E> {
  pub name:    &'static str,
  pub target:  EntityKind,
  /// The referenced entities currently held by value.
  pub collect: fn(&E) -> Vec<Entity>,
  /// Attach the entities resolved from stored keys.
  pub attach:  fn(&mut E, Vec<Entity>) -> Result<()>,
}

/// An entity type with a static descriptor table.
pub trait Describe: AuthorityEntity + Default {
  fn fields() -> &'static [FieldDescriptor<Self>];

  fn refs() -> &'static [RefDescriptor<Self>];
}

/// `<Type>.<name>`, the name a field carries inside a document.
pub fn field_name(kind: EntityKind, name: &str) -> String {
  format!("{}.{}", kind.type_name(), name)
}

fn one<T: AuthorityEntity>(targets: Vec<Entity>) -> Result<Option<T>> {
  Ok(many::<T>(targets)?.into_iter().next())
}

fn many<T: AuthorityEntity>(targets: Vec<Entity>) -> Result<Vec<T>> {
  targets
    .into_iter()
    .map(|e| {
      let found = e.kind();
      T::from_entity(e).ok_or_else(|| {
        Error::Mapping(format!("reference expected {} but found {found}", T::KIND))
      })
    })
    .collect()
}

fn entities<'a, T>(items: impl IntoIterator<Item = &'a T>) -> Vec<Entity>
where
  T: AuthorityEntity + 'a,
{
  items.into_iter().cloned().map(T::into_entity).collect()
}

// ─── Person ──────────────────────────────────────────────────────────────────

static PERSON_FIELDS: &[FieldDescriptor<Person>] = &[
  FieldDescriptor {
    name:     IDS,
    flags:    FieldFlags::KEYWORD,
    id_field: true,
    encode:   |p| codec::encode_ids(&p.ids),
    decode:   Some(|p, v| {
      p.ids = codec::decode_ids(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "gender",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |p| codec::encode_gender(&p.gender),
    decode:   Some(|p, v| {
      p.gender = codec::decode_gender(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "description",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_text(&p.description),
    decode:   Some(|p, v| {
      p.description = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "familyName",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_text(&p.family_name),
    decode:   Some(|p, v| {
      p.family_name = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "givenName",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_text(&p.given_name),
    decode:   Some(|p, v| {
      p.given_name = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "displayName",
    flags:    FieldFlags::SEARCH_ONLY,
    id_field: false,
    encode:   |p| codec::encode_text(&p.display_name()),
    decode:   None,
  },
  FieldDescriptor {
    name:     "dateOfBirth",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |p| codec::encode_date(&p.date_of_birth),
    decode:   Some(|p, v| {
      p.date_of_birth = codec::decode_date(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "dateOfDeath",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |p| codec::encode_date(&p.date_of_death),
    decode:   Some(|p, v| {
      p.date_of_death = codec::decode_date(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "alternateNames",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_texts(&p.alternate_names),
    decode:   Some(|p, v| {
      p.alternate_names = v;
      Ok(())
    }),
  },
];

static PERSON_REFS: &[RefDescriptor<Person>] = &[
  RefDescriptor {
    name:    "placeOfBirth",
    target:  EntityKind::Place,
    collect: |p| entities(&p.place_of_birth),
    attach:  |p, t| {
      p.place_of_birth = one(t)?;
      Ok(())
    },
  },
  RefDescriptor {
    name:    "placeOfDeath",
    target:  EntityKind::Place,
    collect: |p| entities(&p.place_of_death),
    attach:  |p, t| {
      p.place_of_death = one(t)?;
      Ok(())
    },
  },
  RefDescriptor {
    name:    "placeOfActivity",
    target:  EntityKind::Place,
    collect: |p| entities(&p.place_of_activity),
    attach:  |p, t| {
      p.place_of_activity = many(t)?;
      Ok(())
    },
  },
];

impl Describe for Person {
  fn fields() -> &'static [FieldDescriptor<Self>] { PERSON_FIELDS }

  fn refs() -> &'static [RefDescriptor<Self>] { PERSON_REFS }
}

// ─── Corporate ───────────────────────────────────────────────────────────────

static CORPORATE_FIELDS: &[FieldDescriptor<Corporate>] = &[
  FieldDescriptor {
    name:     IDS,
    flags:    FieldFlags::KEYWORD,
    id_field: true,
    encode:   |c| codec::encode_ids(&c.ids),
    decode:   Some(|c, v| {
      c.ids = codec::decode_ids(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "name",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |c| codec::encode_text(&c.name),
    decode:   Some(|c, v| {
      c.name = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "dateOfEstablishment",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |c| codec::encode_date(&c.date_of_establishment),
    decode:   Some(|c, v| {
      c.date_of_establishment = codec::decode_date(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "dateOfTermination",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |c| codec::encode_date(&c.date_of_termination),
    decode:   Some(|c, v| {
      c.date_of_termination = codec::decode_date(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "homepage",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |c| codec::encode_text(&c.homepage),
    decode:   Some(|c, v| {
      c.homepage = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "alternateNames",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |c| codec::encode_texts(&c.alternate_names),
    decode:   Some(|c, v| {
      c.alternate_names = v;
      Ok(())
    }),
  },
];

static CORPORATE_REFS: &[RefDescriptor<Corporate>] = &[
  RefDescriptor {
    name:    "parent",
    target:  EntityKind::Corporate,
    collect: |c| entities(c.parent.as_deref()),
    attach:  |c, t| {
      c.parent = one::<Corporate>(t)?.map(Box::new);
      Ok(())
    },
  },
  RefDescriptor {
    name:    "place",
    target:  EntityKind::Place,
    collect: |c| entities(&c.place),
    attach:  |c, t| {
      c.place = one(t)?;
      Ok(())
    },
  },
];

impl Describe for Corporate {
  fn fields() -> &'static [FieldDescriptor<Self>] { CORPORATE_FIELDS }

  fn refs() -> &'static [RefDescriptor<Self>] { CORPORATE_REFS }
}

// ─── Place ───────────────────────────────────────────────────────────────────

static PLACE_FIELDS: &[FieldDescriptor<Place>] = &[
  FieldDescriptor {
    name:     IDS,
    flags:    FieldFlags::KEYWORD,
    id_field: true,
    encode:   |p| codec::encode_ids(&p.ids),
    decode:   Some(|p, v| {
      p.ids = codec::decode_ids(v)?;
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "name",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_text(&p.name),
    decode:   Some(|p, v| {
      p.name = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "description",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_text(&p.description),
    decode:   Some(|p, v| {
      p.description = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "homepage",
    flags:    FieldFlags::KEYWORD,
    id_field: false,
    encode:   |p| codec::encode_text(&p.homepage),
    decode:   Some(|p, v| {
      p.homepage = codec::decode_text(v);
      Ok(())
    }),
  },
  FieldDescriptor {
    name:     "alternateNames",
    flags:    FieldFlags::TEXT,
    id_field: false,
    encode:   |p| codec::encode_texts(&p.alternate_names),
    decode:   Some(|p, v| {
      p.alternate_names = v;
      Ok(())
    }),
  },
];

impl Describe for Place {
  fn fields() -> &'static [FieldDescriptor<Self>] { PLACE_FIELDS }

  fn refs() -> &'static [RefDescriptor<Self>] { &[] }
}
