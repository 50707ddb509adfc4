//! Assembly of the authority service: index, event bus, providers,
//! aggregator and HTTP router.

pub mod error;
pub mod settings;

pub use settings::ServerConfig;
pub use error::{Error, Result};

use std::{sync::Arc, time::Duration};

use authority_core::{event::EventBus, provider::Provider};
use authority_index::{IndexEngine, IndexProvider, IndexSubscriber, WriterConfig};
use authority_lookup::{Aggregator, AggregatorConfig, ProviderRegistry};
use authority_providers::LobidProvider;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The running service. Dropping it does not flush pending writes; call
/// [`Service::shutdown`].
pub struct Service {
  pub engine:     Arc<IndexEngine>,
  pub events:     Arc<EventBus>,
  pub aggregator: Aggregator,
}

impl Service {
  /// Open the index and wire every component together. Must run inside a
  /// Tokio runtime.
  pub async fn start(config: &ServerConfig) -> Result<Self> {
    let schemes = Arc::new(settings::load_schemes(config.schemes_path.as_deref())?);

    let index = WriterConfig {
      path: settings::expand_tilde(&config.index.path),
      ..config.index.clone()
    };
    let engine = Arc::new(IndexEngine::open(index).await?);

    let events = Arc::new(
      EventBus::builder()
        .subscribe(Arc::new(IndexSubscriber::new(engine.clone())))
        .build(),
    );

    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
    if config.lobid.enabled {
      providers.push(Arc::new(LobidProvider::new(
        config.lobid.client(),
        schemes.clone(),
      )?));
    }
    providers.push(Arc::new(IndexProvider::new(engine.clone())));

    let aggregator = Aggregator::new(
      Arc::new(ProviderRegistry::new(providers)),
      schemes,
      events.clone(),
      AggregatorConfig {
        provider_timeout: config.provider_timeout_ms.map(Duration::from_millis),
      },
    );

    Ok(Self { engine, events, aggregator })
  }

  pub fn router(&self) -> Router {
    authority_api::api_router(self.aggregator.clone()).layer(TraceLayer::new_for_http())
  }

  /// Deliver queued events, then close the index writer.
  pub async fn shutdown(self) {
    self.events.shutdown().await;
    match self.engine.shutdown().await {
      Ok(()) => info!("index closed"),
      Err(e) => warn!("index shutdown failed: {e}"),
    }
  }
}
