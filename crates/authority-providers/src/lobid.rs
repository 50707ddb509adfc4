//! Provider backed by the lobid GND JSON API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use authority_core::{
  corporate::Corporate,
  entity::push_unique_id,
  id::{SchemeId, ScopedId},
  person::Person,
  place::Place,
  provider::{Provider, ProviderResult, SchemeCoverage},
  scheme::SchemeRegistry,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
  Error, Result,
  record::{Record, SearchResponse, TYPE_CORPORATE, TYPE_PERSON, TYPE_PLACE},
};

pub const LOBID_PRIORITY: i32 = 100;

const GND_SCHEME: &str = "DNB";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LobidConfig {
  pub base_url:     String,
  #[serde(rename = "timeout_ms", with = "millis")]
  pub timeout:      Duration,
  /// Maximum number of search hits requested per suggest call.
  pub search_limit: usize,
}

impl Default for LobidConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://lobid.org".into(),
      timeout:      Duration::from_secs(10),
      search_limit: 10,
    }
  }
}

mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
  }
}

/// Suggest and lookup of persons, corporate bodies and places from the GND.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct LobidProvider {
  client:   Client,
  config:   LobidConfig,
  schemes:  Arc<SchemeRegistry>,
  coverage: SchemeCoverage,
}

impl LobidProvider {
  pub fn new(config: LobidConfig, schemes: Arc<SchemeRegistry>) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      client,
      config,
      schemes,
      coverage: SchemeCoverage::only([GND_SCHEME]),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/gnd{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// `GET /gnd/search?q=<term>&filter=type:<type>&format=json`
  async fn search(&self, term: &str, ty: &str) -> Result<Vec<Record>> {
    let url = self.url("/search");
    let resp = self
      .client
      .get(&url)
      .query(&[
        ("q", term.to_owned()),
        ("filter", format!("type:{ty}")),
        ("format", "json".to_owned()),
        ("size", self.config.search_limit.to_string()),
      ])
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(Error::Status { url, status: resp.status().as_u16() });
    }
    let body = resp.bytes().await?;
    let found: SearchResponse = serde_json::from_slice(&body)?;
    debug!(term, ty, hits = found.member.len(), "lobid search");
    Ok(found.member.into_iter().filter(|r| r.is_a(ty)).collect())
  }

  /// `GET /gnd/<id>.json`; `None` for ids outside the GND or unknown to it.
  async fn record(&self, id: &ScopedId) -> Result<Option<Record>> {
    if id.scheme() != &SchemeId::new(GND_SCHEME) {
      return Ok(None);
    }
    if !is_gnd_value(id.value()) {
      debug!(%id, "not a GND id");
      return Ok(None);
    }
    let url = self.url(&format!("/{}.json", id.value()));
    let resp = self.client.get(&url).send().await?;
    match resp.status() {
      StatusCode::NOT_FOUND | StatusCode::GONE => {
        debug!(%id, "not in the GND");
        Ok(None)
      }
      s if s.is_success() => {
        let body = resp.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
      }
      s => Err(Error::Status { url, status: s.as_u16() }),
    }
  }

  /// The record behind `id` if it has type `ty`, with `id` among its ids.
  async fn typed_record(&self, id: &ScopedId, ty: &str) -> Result<Option<Record>> {
    let record = self.record(id).await?.filter(|r| r.is_a(ty));
    if record.is_none() {
      debug!(%id, ty, "no record of this type");
    }
    Ok(record)
  }
}

/// GND ids are digits and `X`, with at most one hyphen before the check
/// character (`118540238`, `11850391X`, `4005728-8`).
fn is_gnd_value(value: &str) -> bool {
  !value.is_empty()
    && !value.starts_with('-')
    && value.matches('-').count() <= 1
    && value.bytes().all(|b| b.is_ascii_digit() || b == b'X' || b == b'x' || b == b'-')
}

#[async_trait]
impl Provider for LobidProvider {
  fn name(&self) -> &str { "lobid-gnd" }

  fn priority(&self) -> i32 { LOBID_PRIORITY }

  fn coverage(&self) -> &SchemeCoverage { &self.coverage }

  async fn suggest_person(&self, term: &str) -> ProviderResult<Vec<Person>> {
    let records = self.search(term, TYPE_PERSON).await?;
    Ok(records.iter().map(|r| r.to_person(&self.schemes)).collect())
  }

  async fn suggest_corporate(&self, term: &str) -> ProviderResult<Vec<Corporate>> {
    let records = self.search(term, TYPE_CORPORATE).await?;
    Ok(records.iter().map(|r| r.to_corporate(&self.schemes)).collect())
  }

  async fn suggest_place(&self, term: &str) -> ProviderResult<Vec<Place>> {
    let records = self.search(term, TYPE_PLACE).await?;
    Ok(records.iter().map(|r| r.to_place(&self.schemes)).collect())
  }

  async fn lookup_person(&self, id: &ScopedId) -> ProviderResult<Option<Person>> {
    let record = self.typed_record(id, TYPE_PERSON).await?;
    Ok(record.map(|r| {
      let mut person = r.to_person(&self.schemes);
      push_unique_id(&mut person.ids, id.clone());
      person
    }))
  }

  async fn lookup_corporate(
    &self,
    id: &ScopedId,
  ) -> ProviderResult<Option<Corporate>> {
    let record = self.typed_record(id, TYPE_CORPORATE).await?;
    Ok(record.map(|r| {
      let mut corporate = r.to_corporate(&self.schemes);
      push_unique_id(&mut corporate.ids, id.clone());
      corporate
    }))
  }

  async fn lookup_place(&self, id: &ScopedId) -> ProviderResult<Option<Place>> {
    let record = self.typed_record(id, TYPE_PLACE).await?;
    Ok(record.map(|r| {
      let mut place = r.to_place(&self.schemes);
      push_unique_id(&mut place.ids, id.clone());
      place
    }))
  }
}
