//! JSON HTTP surface of the authority service.
//!
//! Exposes an axum [`Router`] backed by an [`Aggregator`]. Transport and
//! tracing layers are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(authority_api::api_router(aggregator.clone()))
//! ```

pub mod error;
pub mod import;
pub mod lookup;

use authority_lookup::Aggregator;
use axum::{
  Router,
  routing::{get, post},
};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
  pub aggregator: Aggregator,
}

/// Build the API router for `aggregator`.
pub fn api_router(aggregator: Aggregator) -> Router<()> {
  Router::new()
    .route("/lookup/{segment}/{value}", get(lookup::handler))
    .route("/import/personsById", post(import::persons_by_id))
    .with_state(AppState { aggregator })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use async_trait::async_trait;
  use authority_core::{
    entity::EntityKind,
    event::EventBus,
    id::ScopedId,
    person::Person,
    provider::{Provider, ProviderError, ProviderResult, SchemeCoverage},
    scheme::SchemeRegistry,
  };
  use authority_lookup::{AggregatorConfig, ProviderRegistry};
  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use serde_json::Value;
  use tower::ServiceExt as _;

  use super::*;
  use crate::lookup::Target;

  struct Fixed {
    persons:  Vec<Person>,
    broken:   bool,
    coverage: SchemeCoverage,
  }

  #[async_trait]
  impl Provider for Fixed {
    fn name(&self) -> &str { "fixed" }

    fn priority(&self) -> i32 { 0 }

    fn coverage(&self) -> &SchemeCoverage { &self.coverage }

    async fn suggest_person(&self, term: &str) -> ProviderResult<Vec<Person>> {
      if self.broken {
        return Err(ProviderError::fatal("mapping bug"));
      }
      Ok(
        self
          .persons
          .iter()
          .filter(|p| p.family_name.as_deref().is_some_and(|f| f.starts_with(term)))
          .cloned()
          .collect(),
      )
    }

    async fn lookup_person(&self, id: &ScopedId) -> ProviderResult<Option<Person>> {
      Ok(self.persons.iter().find(|p| p.ids.contains(id)).cloned())
    }
  }

  fn app(broken: bool) -> Router {
    let schemes = Arc::new(SchemeRegistry::builtin());
    let arendt = Person {
      ids: vec![schemes.parse_id("DNB:11850391X").unwrap()],
      family_name: Some("Arendt".into()),
      given_name: Some("Hannah".into()),
      ..Default::default()
    };
    let provider = Fixed { persons: vec![arendt], broken, coverage: SchemeCoverage::All };
    let aggregator = Aggregator::new(
      Arc::new(ProviderRegistry::new(vec![Arc::new(provider)])),
      schemes,
      Arc::new(EventBus::builder().build()),
      AggregatorConfig::default(),
    );
    api_router(aggregator)
  }

  async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .body(Body::from(body.to_string()))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[test]
  fn type_segment_selects_operation() {
    assert_eq!(Target::parse("person").unwrap(), Target::Lookup(EntityKind::Person));
    assert_eq!(Target::parse("Places").unwrap(), Target::Suggest(EntityKind::Place));
    assert_eq!(
      Target::parse("corporates").unwrap(),
      Target::Suggest(EntityKind::Corporate)
    );
    assert!(Target::parse("animals").is_err());
  }

  #[tokio::test]
  async fn lookup_returns_entity_json() {
    let (status, body) = send(app(false), "GET", "/lookup/person/gnd:11850391X", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "person");
    assert_eq!(body["familyName"], "Arendt");
    assert_eq!(body["ids"][0], "DNB:11850391X");
  }

  #[tokio::test]
  async fn lookup_of_unknown_id_is_null() {
    let (status, body) = send(app(false), "GET", "/lookup/person/DNB:0", "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
  }

  #[tokio::test]
  async fn malformed_input_is_bad_request() {
    let (status, body) = send(app(false), "GET", "/lookup/person/WIKIDATA:Q1", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("WIKIDATA"));

    let (status, _) = send(app(false), "GET", "/lookup/animal/DNB:1", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn suggest_returns_list() {
    let (status, body) = send(app(false), "GET", "/lookup/persons/Are", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(app(false), "GET", "/lookup/places/Weimar", "").await;
    assert_eq!(body, serde_json::json!([]));
  }

  #[tokio::test]
  async fn fatal_provider_failure_is_server_error() {
    let (status, body) = send(app(true), "GET", "/lookup/persons/Are", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("fixed"));
  }

  #[tokio::test]
  async fn import_reports_counts() {
    let (status, body) = send(
      app(false),
      "POST",
      "/import/personsById",
      "DNB:11850391X\nDNB:0\nbogus\n",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requested"], 3);
    assert_eq!(body["imported"], 1);
    assert_eq!(body["notFound"], 1);
    assert_eq!(body["invalid"][0], "bogus");
  }
}
