//! Value codecs between domain types and the plain strings stored in index
//! fields.
//!
//! Every encoder yields zero or more values (an absent optional is zero
//! values; a list is one value per element). Decoders receive all values of a
//! field in document order. A value that does not decode is a mapping error:
//! the index only ever holds what the encoders produced.

use std::str::FromStr;

use authority_core::{date::PartialDate, id::ScopedId, person::Gender};

use crate::{Error, Result};

fn decode_err(what: &str, raw: &str, e: impl std::fmt::Display) -> Error {
  Error::Mapping(format!("cannot decode {what} from {raw:?}: {e}"))
}

// ─── Text ────────────────────────────────────────────────────────────────────

pub fn encode_text(value: &Option<String>) -> Vec<String> {
  value
    .iter()
    .filter(|s| !s.trim().is_empty())
    .cloned()
    .collect()
}

pub fn encode_texts(values: &[String]) -> Vec<String> {
  values
    .iter()
    .filter(|s| !s.trim().is_empty())
    .cloned()
    .collect()
}

/// The first stored value; later ones are ignored for single-valued fields.
pub fn decode_text(values: Vec<String>) -> Option<String> {
  values.into_iter().next()
}

// ─── Parsed scalars ──────────────────────────────────────────────────────────

fn encode_display<T: ToString>(value: &Option<T>) -> Vec<String> {
  value.iter().map(T::to_string).collect()
}

fn decode_parsed<T>(what: &str, values: Vec<String>) -> Result<Option<T>>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  values
    .into_iter()
    .next()
    .map(|raw| raw.parse::<T>().map_err(|e| decode_err(what, &raw, e)))
    .transpose()
}

pub fn encode_date(value: &Option<PartialDate>) -> Vec<String> {
  encode_display(value)
}

pub fn decode_date(values: Vec<String>) -> Result<Option<PartialDate>> {
  decode_parsed("partial date", values)
}

pub fn encode_gender(value: &Option<Gender>) -> Vec<String> {
  encode_display(value)
}

pub fn decode_gender(values: Vec<String>) -> Result<Option<Gender>> {
  decode_parsed("gender", values)
}

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// `scheme:value`, one per id.
pub fn encode_ids(ids: &[ScopedId]) -> Vec<String> {
  ids.iter().map(ScopedId::to_string).collect()
}

pub fn decode_ids(values: Vec<String>) -> Result<Vec<ScopedId>> {
  let mut ids: Vec<ScopedId> = Vec::with_capacity(values.len());
  for raw in values {
    let id = raw
      .parse::<ScopedId>()
      .map_err(|e| decode_err("scoped id", &raw, e))?;
    if !ids.contains(&id) {
      ids.push(id);
    }
  }
  Ok(ids)
}
