//! In-process, topic-keyed event delivery.
//!
//! The bus is built once with a fixed list of subscribers. [`EventBus::publish`]
//! delivers on the caller's task in registration order; a failing subscriber
//! is logged and delivery continues. [`EventBus::publish_async`] hands the
//! event to a single background worker, so a subscriber is never running two
//! events at once.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::{
  sync::{mpsc, oneshot},
  task::JoinHandle,
};
use uuid::Uuid;

use crate::{Error, Result, entity::Entity, provider::BoxError};

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
  /// A canonical entity was produced by a lookup.
  Indexed,
  /// Many entities to persist in one writer session.
  ImportBatch,
}

#[derive(Debug, Clone)]
pub enum Payload {
  Indexed(Entity),
  ImportBatch(Vec<Entity>),
}

#[derive(Debug, Clone)]
pub struct Event {
  /// Correlates log lines of all subscribers handling this event.
  pub id:      Uuid,
  pub payload: Payload,
}

impl Event {
  pub fn indexed(entity: impl Into<Entity>) -> Self {
    Self { id: Uuid::new_v4(), payload: Payload::Indexed(entity.into()) }
  }

  pub fn import_batch(entities: Vec<Entity>) -> Self {
    Self { id: Uuid::new_v4(), payload: Payload::ImportBatch(entities) }
  }

  pub fn topic(&self) -> Topic {
    match self.payload {
      Payload::Indexed(_) => Topic::Indexed,
      Payload::ImportBatch(_) => Topic::ImportBatch,
    }
  }
}

// ─── Subscribers ─────────────────────────────────────────────────────────────

#[async_trait]
pub trait Subscriber: Send + Sync {
  fn name(&self) -> &str;

  /// Topics this subscriber wants to receive.
  fn topics(&self) -> &[Topic];

  async fn handle(&self, event: &Event) -> std::result::Result<(), BoxError>;
}

/// Outcome of a synchronous publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
  pub delivered: usize,
  pub failed:    usize,
}

// ─── Bus ─────────────────────────────────────────────────────────────────────

enum Job {
  Deliver(Arc<dyn Subscriber>, Arc<Event>),
  Flush(oneshot::Sender<()>),
}

#[derive(Default)]
pub struct EventBusBuilder {
  subscribers: Vec<Arc<dyn Subscriber>>,
}

impl EventBusBuilder {
  pub fn subscribe(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
    self.subscribers.push(subscriber);
    self
  }

  /// Finish the bus and start its background worker. Must be called from
  /// within a Tokio runtime.
  pub fn build(self) -> EventBus {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_worker(rx));
    for s in &self.subscribers {
      tracing::info!(subscriber = s.name(), topics = ?s.topics(), "event subscriber registered");
    }
    EventBus {
      subscribers: self.subscribers,
      queue:       Mutex::new(Some(tx)),
      worker:      Mutex::new(Some(worker)),
    }
  }
}

pub struct EventBus {
  subscribers: Vec<Arc<dyn Subscriber>>,
  queue:       Mutex<Option<mpsc::UnboundedSender<Job>>>,
  worker:      Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for EventBus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EventBus")
      .field("subscribers", &self.subscribers.iter().map(|s| s.name()).collect::<Vec<_>>())
      .finish_non_exhaustive()
  }
}

impl EventBus {
  pub fn builder() -> EventBusBuilder { EventBusBuilder::default() }

  fn interested(&self, topic: Topic) -> impl Iterator<Item = &Arc<dyn Subscriber>> {
    self
      .subscribers
      .iter()
      .filter(move |s| s.topics().contains(&topic))
  }

  /// Deliver `event` to every interested subscriber on the current task, in
  /// registration order. Failures are logged and do not stop delivery.
  pub async fn publish(&self, event: &Event) -> Delivery {
    let mut delivery = Delivery::default();
    for subscriber in self.interested(event.topic()) {
      match subscriber.handle(event).await {
        Ok(()) => delivery.delivered += 1,
        Err(e) => {
          delivery.failed += 1;
          tracing::warn!(
            event = %event.id,
            topic = %event.topic(),
            subscriber = subscriber.name(),
            "subscriber failed: {e}"
          );
        }
      }
    }
    delivery
  }

  /// Queue `event` for the background worker. Returns the number of
  /// subscribers it was queued for.
  pub fn publish_async(&self, event: Event) -> Result<usize> {
    let guard = self.queue.lock().map_err(|_| Error::EventBusClosed)?;
    let tx = guard.as_ref().ok_or(Error::EventBusClosed)?;
    let event = Arc::new(event);
    let mut queued = 0;
    for subscriber in self.interested(event.topic()) {
      tx.send(Job::Deliver(subscriber.clone(), event.clone()))
        .map_err(|_| Error::EventBusClosed)?;
      queued += 1;
    }
    Ok(queued)
  }

  /// Wait until every event queued before this call has been handled.
  pub async fn flush(&self) -> Result<()> {
    let (done_tx, done_rx) = oneshot::channel();
    {
      let guard = self.queue.lock().map_err(|_| Error::EventBusClosed)?;
      let tx = guard.as_ref().ok_or(Error::EventBusClosed)?;
      tx.send(Job::Flush(done_tx)).map_err(|_| Error::EventBusClosed)?;
    }
    done_rx.await.map_err(|_| Error::EventBusClosed)
  }

  /// Stop accepting asynchronous events and wait for the queue to drain.
  /// Synchronous [`publish`](Self::publish) keeps working afterwards.
  pub async fn shutdown(&self) {
    let sender = self.queue.lock().ok().and_then(|mut q| q.take());
    drop(sender);
    let worker = self.worker.lock().ok().and_then(|mut w| w.take());
    if let Some(worker) = worker {
      if let Err(e) = worker.await {
        tracing::warn!("event worker ended abnormally: {e}");
      }
    }
  }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>) {
  while let Some(job) = rx.recv().await {
    match job {
      Job::Deliver(subscriber, event) => {
        if let Err(e) = subscriber.handle(&event).await {
          tracing::warn!(
            event = %event.id,
            topic = %event.topic(),
            subscriber = subscriber.name(),
            "async subscriber failed: {e}"
          );
        }
      }
      Job::Flush(done) => {
        let _ = done.send(());
      }
    }
  }
  tracing::debug!("event worker stopped");
}
