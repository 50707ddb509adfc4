//! Lifecycle of the exclusive write connection.
//!
//! All mutations run on one worker task, one job at a time. The worker opens
//! the write connection lazily on the first job and closes it again:
//!
//! - right after a job, when `close_writer_early` is set or the number of
//!   writes since the last close reaches `max_writes_before_close`;
//! - after `idle_close_delay` without a new job (each job restarts the
//!   delay);
//! - after [`WriteOp::Optimize`];
//! - on shutdown, once every accepted write has finished.
//!
//! Submitters hold a shared guard on the lifecycle lock until their job is
//! done; shutdown takes the exclusive guard, so the final close never races an
//! in-flight write.

use std::{
  path::PathBuf,
  sync::{Arc, Mutex},
  time::Duration,
};

use serde::Deserialize;
use tokio::{
  sync::{OwnedRwLockReadGuard, RwLock, mpsc, oneshot, watch},
  task::JoinHandle,
  time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  document::{Document, Term},
  schema::SCHEMA,
  store::{self, BUSY_TIMEOUT},
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
  /// Index database file.
  pub path:                    PathBuf,
  /// Close the connection after every write.
  pub close_writer_early:      bool,
  /// Writes after which the connection is closed regardless of load.
  pub max_writes_before_close: u64,
  /// Quiet period after which an open connection is closed.
  #[serde(with = "millis", rename = "idle_close_delay_ms")]
  pub idle_close_delay:        Duration,
}

impl Default for WriterConfig {
  fn default() -> Self {
    Self {
      path:                    PathBuf::from("authority-index.db"),
      close_writer_early:      false,
      max_writes_before_close: 500,
      idle_close_delay:        Duration::from_secs(2),
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

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WriterStatus {
  Closed,
  Opening,
  Open,
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum WriteOp {
  /// Replace the documents matching `key` with `doc`.
  Put { key: Term, doc: Document },
  /// Compact the store, then close.
  Optimize,
}

struct WriteJob {
  op:     WriteOp,
  done:   oneshot::Sender<Result<()>>,
  _guard: OwnedRwLockReadGuard<()>,
}

/// Resolves once the submitted job has been applied.
pub type WriteTicket = oneshot::Receiver<Result<()>>;

// ─── Writer ──────────────────────────────────────────────────────────────────

pub struct IndexWriter {
  lifecycle: Arc<RwLock<()>>,
  queue:     Mutex<Option<mpsc::UnboundedSender<WriteJob>>>,
  worker:    Mutex<Option<JoinHandle<()>>>,
  status:    watch::Receiver<WriterStatus>,
}

impl std::fmt::Debug for IndexWriter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("IndexWriter")
      .field("status", &*self.status.borrow())
      .finish_non_exhaustive()
  }
}

impl IndexWriter {
  /// Create the schema if needed and start the worker. The connection is
  /// closed again before this returns.
  pub async fn start(config: WriterConfig) -> Result<Self> {
    let (status_tx, status) = watch::channel(WriterStatus::Closed);
    let mut worker = Worker {
      config,
      conn: None,
      writes: 0,
      status: status_tx,
    };
    worker.open().await?;
    worker.close("startup").await;

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(worker.run(rx));
    Ok(Self {
      lifecycle: Arc::new(RwLock::new(())),
      queue:     Mutex::new(Some(tx)),
      worker:    Mutex::new(Some(handle)),
      status,
    })
  }

  pub fn status(&self) -> WriterStatus { *self.status.borrow() }

  /// A receiver that observes every status transition.
  pub fn watch_status(&self) -> watch::Receiver<WriterStatus> {
    self.status.clone()
  }

  /// Queue `op` and return a ticket for its outcome.
  pub async fn submit(&self, op: WriteOp) -> Result<WriteTicket> {
    let guard = self.lifecycle.clone().read_owned().await;
    let (done, ticket) = oneshot::channel();
    let queue = self.queue.lock().map_err(|_| Error::WriterShutDown)?;
    let tx = queue.as_ref().ok_or(Error::WriterShutDown)?;
    tx.send(WriteJob { op, done, _guard: guard })
      .map_err(|_| Error::WriterShutDown)?;
    Ok(ticket)
  }

  /// Queue `op` and wait for it to be applied.
  pub async fn apply(&self, op: WriteOp) -> Result<()> {
    let ticket = self.submit(op).await?;
    ticket.await.map_err(|_| Error::WriterGone)?
  }

  pub async fn put(&self, key: Term, doc: Document) -> Result<()> {
    self.apply(WriteOp::Put { key, doc }).await
  }

  pub async fn optimize(&self) -> Result<()> { self.apply(WriteOp::Optimize).await }

  /// Refuse new writes, wait for in-flight writes, then close the
  /// connection and stop the worker. Idempotent.
  pub async fn shutdown(&self) -> Result<()> {
    let sender = self.queue.lock().ok().and_then(|mut q| q.take());
    if sender.is_none() {
      return Ok(());
    }
    // Every accepted job holds a shared guard until it is done.
    let _exclusive = self.lifecycle.write().await;
    drop(sender);
    let worker = self.worker.lock().ok().and_then(|mut w| w.take());
    if let Some(worker) = worker {
      worker.await.map_err(|_| Error::WriterGone)?;
    }
    info!("index writer shut down");
    Ok(())
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

struct Worker {
  config: WriterConfig,
  conn:   Option<tokio_rusqlite::Connection>,
  /// Completed writes since the connection was last closed.
  writes: u64,
  status: watch::Sender<WriterStatus>,
}

impl Worker {
  async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WriteJob>) {
    let mut idle_deadline: Option<Instant> = None;
    loop {
      let job = match idle_deadline {
        Some(deadline) => tokio::select! {
          biased;
          job = rx.recv() => job,
          () = tokio::time::sleep_until(deadline) => {
            idle_deadline = None;
            self.close("idle").await;
            continue;
          }
        },
        None => rx.recv().await,
      };
      let Some(job) = job else { break };
      // A new job cancels any pending idle close.
      idle_deadline = None;

      let WriteJob { op, done, _guard } = job;
      let is_put = matches!(op, WriteOp::Put { .. });
      let result = self.execute(op).await;
      let failed = result.is_err();
      let _ = done.send(result);
      drop(_guard);

      if failed {
        // Start the next job from a fresh connection.
        self.close("write failure").await;
      } else if is_put {
        if self.config.close_writer_early {
          self.close("close_writer_early").await;
        } else if self.writes >= self.config.max_writes_before_close {
          self.close("batch complete").await;
        } else {
          idle_deadline = Some(Instant::now() + self.config.idle_close_delay);
        }
      }
    }
    self.close("shutdown").await;
    debug!("index writer worker stopped");
  }

  async fn execute(&mut self, op: WriteOp) -> Result<()> {
    let conn = self.open().await?;
    match op {
      WriteOp::Put { key, doc } => {
        debug!(%key, fields = doc.fields.len(), "writing document");
        conn
          .call(move |conn| {
            store::put_document(conn, &key, &doc)?;
            Ok(())
          })
          .await?;
        self.writes += 1;
      }
      WriteOp::Optimize => {
        info!("optimizing index");
        conn
          .call(|conn| {
            store::compact(conn)?;
            Ok(())
          })
          .await?;
        self.close("optimize").await;
      }
    }
    Ok(())
  }

  /// The open connection, opening it first if needed.
  async fn open(&mut self) -> Result<tokio_rusqlite::Connection> {
    if let Some(conn) = &self.conn {
      return Ok(conn.clone());
    }
    self.status.send_replace(WriterStatus::Opening);
    match Self::connect(&self.config.path).await {
      Ok(conn) => {
        self.status.send_replace(WriterStatus::Open);
        debug!(path = %self.config.path.display(), "index writer opened");
        self.conn = Some(conn.clone());
        Ok(conn)
      }
      Err(e) => {
        self.status.send_replace(WriterStatus::Closed);
        Err(e)
      }
    }
  }

  async fn connect(path: &std::path::Path) -> Result<tokio_rusqlite::Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    let conn = tokio_rusqlite::Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(conn)
  }

  /// Checkpoint and close the connection, if open. Failures are logged; the
  /// handle is released either way.
  async fn close(&mut self, reason: &str) {
    let Some(conn) = self.conn.take() else { return };
    if let Err(e) = conn
      .call(|conn| {
        store::checkpoint(conn)?;
        Ok(())
      })
      .await
    {
      warn!("index checkpoint failed: {e}");
    }
    if let Err(e) = conn.close().await {
      warn!("failed to close index writer: {e}");
    }
    debug!(reason, writes = self.writes, "index writer closed");
    self.writes = 0;
    self.status.send_replace(WriterStatus::Closed);
  }
}
