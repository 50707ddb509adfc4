use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use async_trait::async_trait;
use authority_core::{
  entity::{Entity, EntityKind},
  event::{Event, EventBus, Payload, Subscriber, Topic},
  id::ScopedId,
  person::Person,
  place::Place,
  provider::{BoxError, Provider, ProviderError, ProviderResult, SchemeCoverage},
  scheme::SchemeRegistry,
};

use crate::{Aggregator, AggregatorConfig, Error, ProviderRegistry, aggregator::merge_pass};

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Failure {
  Transient,
  Fatal,
}

struct Stub {
  name:     &'static str,
  priority: i32,
  coverage: SchemeCoverage,
  persons:  Vec<Person>,
  failure:  Option<Failure>,
  delay:    Option<Duration>,
}

impl Stub {
  fn new(name: &'static str, priority: i32, persons: Vec<Person>) -> Self {
    Self {
      name,
      priority,
      coverage: SchemeCoverage::All,
      persons,
      failure: None,
      delay: None,
    }
  }

  fn covering(mut self, schemes: &[&str]) -> Self {
    self.coverage = SchemeCoverage::only(schemes.iter().copied());
    self
  }

  fn failing(mut self, failure: Failure) -> Self {
    self.failure = Some(failure);
    self
  }

  fn slow(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  async fn answer<T>(&self, value: T) -> ProviderResult<T> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    match self.failure {
      Some(Failure::Transient) => Err(ProviderError::transient("connection refused")),
      Some(Failure::Fatal) => Err(ProviderError::fatal("unexpected response shape")),
      None => Ok(value),
    }
  }
}

#[async_trait]
impl Provider for Stub {
  fn name(&self) -> &str { self.name }

  fn priority(&self) -> i32 { self.priority }

  fn coverage(&self) -> &SchemeCoverage { &self.coverage }

  async fn suggest_person(&self, term: &str) -> ProviderResult<Vec<Person>> {
    let term = term.to_lowercase();
    let hits = self
      .persons
      .iter()
      .filter(|p| {
        p.family_name
          .as_deref()
          .is_some_and(|n| n.to_lowercase().starts_with(&term))
      })
      .cloned()
      .collect();
    self.answer(hits).await
  }

  async fn lookup_person(&self, id: &ScopedId) -> ProviderResult<Option<Person>> {
    let hit = self.persons.iter().find(|p| p.ids.contains(id)).cloned();
    self.answer(hit).await
  }
}

#[derive(Default)]
struct Recorder {
  events: Mutex<Vec<Event>>,
}

#[async_trait]
impl Subscriber for Recorder {
  fn name(&self) -> &str { "recorder" }

  fn topics(&self) -> &[Topic] { &[Topic::Indexed, Topic::ImportBatch] }

  async fn handle(&self, event: &Event) -> Result<(), BoxError> {
    self.events.lock().unwrap().push(event.clone());
    Ok(())
  }
}

fn id(s: &str) -> ScopedId { SchemeRegistry::builtin().parse_id(s).unwrap() }

fn person(family: &str, given: &str, ids: &[&str]) -> Person {
  Person {
    ids: ids.iter().map(|s| id(s)).collect(),
    family_name: Some(family.into()),
    given_name: Some(given.into()),
    ..Default::default()
  }
}

fn aggregator(providers: Vec<Stub>) -> (Aggregator, Arc<Recorder>, Arc<EventBus>) {
  aggregator_with(providers, AggregatorConfig::default())
}

fn aggregator_with(
  providers: Vec<Stub>,
  config: AggregatorConfig,
) -> (Aggregator, Arc<Recorder>, Arc<EventBus>) {
  let recorder = Arc::new(Recorder::default());
  let bus = Arc::new(EventBus::builder().subscribe(recorder.clone()).build());
  let providers = providers
    .into_iter()
    .map(|p| Arc::new(p) as Arc<dyn Provider>)
    .collect();
  let aggregator = Aggregator::new(
    Arc::new(ProviderRegistry::new(providers)),
    Arc::new(SchemeRegistry::builtin()),
    bus.clone(),
    config,
  );
  (aggregator, recorder, bus)
}

fn family_names(persons: &[Person]) -> Vec<&str> {
  persons.iter().filter_map(|p| p.family_name.as_deref()).collect()
}

// ─── Merge pass ──────────────────────────────────────────────────────────────

#[test]
fn shared_id_merges_regardless_of_order() {
  let a = person("Tester", "Susanne", &["DNB:118540238", "VIAF:1"]);
  let b = Person {
    description: Some("Chemist".into()),
    ..person("Tester", "S.", &["VIAF:1"])
  };

  for items in [vec![a.clone(), b.clone()], vec![b, a]] {
    let merged = merge_pass(items);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].ids.len(), 2);
    assert_eq!(merged[0].description.as_deref(), Some("Chemist"));
  }
}

#[test]
fn similar_ids_merge_only_above_threshold() {
  let long = person("A", "x", &["gnd:123456789"]);
  let mid = person("B", "y", &["gnd:1234567"]);
  let short = person("C", "z", &["gnd:12"]);

  assert_eq!(merge_pass(vec![long, mid.clone()]).len(), 1);
  assert_eq!(merge_pass(vec![mid, short]).len(), 2);
}

#[test]
fn merged_record_keeps_earliest_position() {
  let merged = merge_pass(vec![
    person("First", "a", &["DNB:1"]),
    person("Second", "b", &["DNB:2"]),
    person("First", "a", &["DNB:1", "VIAF:9"]),
  ]);
  assert_eq!(family_names(&merged), vec!["First", "Second"]);
  assert_eq!(merged[0].ids.len(), 2);
}

// ─── Suggest ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn higher_priority_results_come_first() {
  let (agg, ..) = aggregator(vec![
    Stub::new("low", 0, vec![
      person("Tesla", "Nikola", &["VIAF:10"]),
      person("Tester", "Paul", &["VIAF:11"]),
    ]),
    Stub::new("high", 100, vec![
      person("Testa", "Anna", &["DNB:20"]),
      person("Testi", "Bert", &["DNB:21"]),
    ]),
  ]);

  let persons = agg.suggest::<Person>("tes").await.unwrap();
  assert_eq!(family_names(&persons), vec!["Testa", "Testi", "Tesla", "Tester"]);
}

#[tokio::test]
async fn equal_priority_keeps_registration_order() {
  let (agg, ..) = aggregator(vec![
    Stub::new("one", 5, vec![person("Mann", "Thomas", &["DNB:1"])]),
    Stub::new("two", 5, vec![person("Mann", "Heinrich", &["DNB:2"])]),
  ]);
  let persons = agg.suggest::<Person>("mann").await.unwrap();
  assert_eq!(persons[0].given_name.as_deref(), Some("Thomas"));
  assert_eq!(persons[1].given_name.as_deref(), Some("Heinrich"));
}

#[tokio::test]
async fn suggest_merges_across_providers() {
  let (agg, ..) = aggregator(vec![
    Stub::new("gnd", 100, vec![person("Goethe", "Johann Wolfgang", &["DNB:118540238"])]),
    Stub::new("viaf", 0, vec![Person {
      description: Some("Poet".into()),
      ..person("Goethe", "J. W.", &["DNB:118540238", "VIAF:24602065"])
    }]),
  ]);

  let persons = agg.suggest::<Person>("goe").await.unwrap();
  assert_eq!(persons.len(), 1);
  let goethe = &persons[0];
  assert_eq!(goethe.given_name.as_deref(), Some("Johann Wolfgang"));
  assert_eq!(goethe.description.as_deref(), Some("Poet"));
  assert_eq!(goethe.ids.len(), 2);
  assert!(goethe.alternate_names.iter().any(|n| n == "Goethe, J. W."));
}

#[tokio::test]
async fn unsupported_and_unavailable_providers_are_skipped() {
  let (agg, ..) = aggregator(vec![
    Stub::new("down", 100, vec![person("Kafka", "Franz", &["DNB:1"])])
      .failing(Failure::Transient),
    Stub::new("up", 0, vec![person("Kafka", "Hermann", &["DNB:2"])]),
  ]);

  let persons = agg.suggest::<Person>("kaf").await.unwrap();
  assert_eq!(persons.len(), 1);
  assert_eq!(persons[0].given_name.as_deref(), Some("Hermann"));

  // Stubs offer no place search at all.
  assert!(agg.suggest::<Place>("berlin").await.unwrap().is_empty());
}

#[tokio::test]
async fn fatal_provider_failure_aborts_the_call() {
  let (agg, ..) = aggregator(vec![
    Stub::new("ok", 100, vec![person("Kafka", "Franz", &["DNB:1"])]),
    Stub::new("broken", 0, vec![]).failing(Failure::Fatal),
  ]);
  let err = agg.suggest::<Person>("kaf").await.unwrap_err();
  assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "broken"));
}

#[tokio::test]
async fn slow_provider_is_dropped_after_timeout() {
  let config = AggregatorConfig { provider_timeout: Some(Duration::from_millis(50)) };
  let (agg, ..) = aggregator_with(
    vec![
      Stub::new("slow", 100, vec![person("Kafka", "Franz", &["DNB:1"])])
        .slow(Duration::from_secs(5)),
      Stub::new("fast", 0, vec![person("Kafka", "Ottla", &["DNB:3"])]),
    ],
    config,
  );
  let persons = agg.suggest::<Person>("kaf").await.unwrap();
  assert_eq!(family_names(&persons), vec!["Kafka"]);
  assert_eq!(persons[0].given_name.as_deref(), Some("Ottla"));
}

#[tokio::test]
async fn suggest_kind_wraps_entities() {
  let (agg, ..) = aggregator(vec![Stub::new("p", 0, vec![person("Brecht", "Bertolt", &[
    "DNB:118514768",
  ])])]);
  let found = agg.suggest_kind(EntityKind::Person, "bre").await.unwrap();
  assert!(matches!(found.as_slice(), [Entity::Person(_)]));
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_consults_only_covering_providers() {
  let (agg, ..) = aggregator(vec![
    Stub::new("gnd", 100, vec![person("Arendt", "Hannah", &["DNB:11850391X"])])
      .covering(&["DNB"]),
    Stub::new("orcid", 0, vec![]).covering(&["ORCID"]).failing(Failure::Fatal),
  ]);

  // The fatal provider does not cover DNB and is never asked.
  let found = agg.lookup::<Person>(&id("gnd:11850391X")).await.unwrap();
  assert_eq!(found.and_then(|p| p.given_name).as_deref(), Some("Hannah"));
}

#[tokio::test]
async fn lookup_merges_by_priority() {
  let (agg, ..) = aggregator(vec![
    Stub::new("low", 0, vec![Person {
      description: Some("Philosopher".into()),
      ..person("Arendt", "H.", &["DNB:11850391X", "VIAF:9"])
    }]),
    Stub::new("high", 100, vec![person("Arendt", "Hannah", &["DNB:11850391X"])]),
  ]);
  let found = agg
    .lookup::<Person>(&id("DNB:11850391X"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.given_name.as_deref(), Some("Hannah"));
  assert_eq!(found.description.as_deref(), Some("Philosopher"));
  assert_eq!(found.ids.len(), 2);
}

#[tokio::test]
async fn lookup_publishes_found_entity() {
  let (agg, recorder, _bus) = aggregator(vec![Stub::new("gnd", 100, vec![person(
    "Arendt",
    "Hannah",
    &["DNB:11850391X"],
  )])]);

  agg.lookup::<Person>(&id("DNB:11850391X")).await.unwrap();
  let events = recorder.events.lock().unwrap();
  assert_eq!(events.len(), 1);
  assert!(matches!(&events[0].payload, Payload::Indexed(Entity::Person(p))
    if p.family_name.as_deref() == Some("Arendt")));
}

#[tokio::test]
async fn unknown_id_is_none_and_publishes_nothing() {
  let (agg, recorder, _bus) = aggregator(vec![
    Stub::new("gnd", 100, vec![person("Arendt", "Hannah", &["DNB:11850391X"])]),
    Stub::new("loc", 0, vec![]).covering(&["LOC"]),
  ]);

  assert!(agg.lookup::<Person>(&id("DNB:000")).await.unwrap().is_none());
  assert!(agg.lookup_kind(EntityKind::Place, &id("DNB:000")).await.unwrap().is_none());
  assert!(recorder.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn lookup_with_no_covering_provider_is_none() {
  let (agg, ..) = aggregator(vec![Stub::new("loc", 0, vec![]).covering(&["LOC"])]);
  assert!(agg.lookup::<Person>(&id("ORCID:0000-0001")).await.unwrap().is_none());
}

#[tokio::test]
async fn parse_id_canonicalizes_and_rejects_unknown_schemes() {
  let (agg, ..) = aggregator(vec![]);
  assert_eq!(agg.parse_id("gnd:118540238").unwrap().to_string(), "DNB:118540238");
  assert!(matches!(agg.parse_id("WIKIDATA:Q1"), Err(Error::Core(_))));
  assert!(matches!(agg.parse_id("DNB:"), Err(Error::Core(_))));
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_reports_and_publishes_one_batch() {
  let (agg, recorder, bus) = aggregator(vec![Stub::new("gnd", 100, vec![
    person("Arendt", "Hannah", &["DNB:11850391X"]),
    person("Benjamin", "Walter", &["DNB:118508288"]),
  ])]);

  let report = agg
    .import_persons("DNB:11850391X\n gnd:118508288  DNB:404 nonsense\tWIKIDATA:Q1")
    .await
    .unwrap();
  assert_eq!(report.requested, 5);
  assert_eq!(report.imported, 2);
  assert_eq!(report.not_found, 1);
  assert_eq!(report.invalid, vec!["nonsense", "WIKIDATA:Q1"]);

  bus.flush().await.unwrap();
  let events = recorder.events.lock().unwrap();
  assert_eq!(events.len(), 1, "resolution must not publish per-item events");
  match &events[0].payload {
    Payload::ImportBatch(batch) => assert_eq!(batch.len(), 2),
    other => panic!("unexpected payload {other:?}"),
  }
}

#[tokio::test]
async fn import_counts_one_person_named_twice_once() {
  let (agg, recorder, bus) = aggregator(vec![Stub::new("gnd", 100, vec![
    person("Arendt", "Hannah", &["DNB:11850391X"]),
  ])]);

  let report = agg.import_persons("DNB:11850391X gnd:11850391X").await.unwrap();
  assert_eq!((report.requested, report.imported, report.not_found), (2, 1, 0));

  bus.flush().await.unwrap();
  let events = recorder.events.lock().unwrap();
  match &events[0].payload {
    Payload::ImportBatch(batch) => assert_eq!(batch.len(), 1),
    other => panic!("unexpected payload {other:?}"),
  }
}

#[tokio::test]
async fn import_of_nothing_found_publishes_nothing() {
  let (agg, recorder, bus) = aggregator(vec![Stub::new("gnd", 100, vec![])]);
  let report = agg.import_persons("DNB:1 DNB:2").await.unwrap();
  assert_eq!((report.requested, report.imported, report.not_found), (2, 0, 2));

  bus.flush().await.unwrap();
  assert!(recorder.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn import_report_serializes_camel_case() {
  let (agg, ..) = aggregator(vec![]);
  let report = agg.import_persons("").await.unwrap();
  let json = serde_json::to_value(&report).unwrap();
  assert_eq!(json["requested"], 0);
  assert_eq!(json["notFound"], 0);
  assert!(json["invalid"].as_array().unwrap().is_empty());
}
