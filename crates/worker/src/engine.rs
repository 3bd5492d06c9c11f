//! Event dispatch and engine state.
//!
//! The engine never runs a loop of its own; it is invoked by discrete
//! host-delivered events. Each event carries a completion port where the
//! host needs the outcome, and the dispatch loop awaits every handler
//! before taking the next event, which preserves the platform's "extend
//! lifetime until done" contract. Fetches are the exception: they are spawned so
//! concurrent requests interleave, and their completion is the reply port.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};

use swkit_client::fetch::{Fetch, WebRequest, resolve};
use swkit_core::cache::CacheDb;
use swkit_core::{AppConfig, Error};

use crate::classifier::{ClassifierRules, PolicyClass, classify};
use crate::lifecycle::{self, ActivationReport, InstallReport};
use crate::messages::{Inbound, Outbound, parse_inbound};
use crate::notify;
use crate::strategy::{self, Served};

/// Lifecycle phase. Strictly ordered; events that arrive out of order are
/// lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No install has completed yet.
    New,
    /// Installed and waiting to take over.
    Installed,
    /// Serving requests.
    Active,
}

/// A platform event delivered by the host.
#[derive(Debug)]
pub enum Event {
    Install {
        done: Option<oneshot::Sender<Result<InstallReport, Error>>>,
    },
    Activate {
        done: Option<oneshot::Sender<Result<ActivationReport, Error>>>,
    },
    Fetch {
        request: WebRequest,
        /// `Ok(None)` means not intercepted: the host forwards the
        /// request natively.
        respond_to: oneshot::Sender<Result<Option<Served>, Error>>,
    },
    Message {
        payload: serde_json::Value,
        reply: Option<oneshot::Sender<Outbound>>,
    },
    Sync {
        tag: String,
    },
    Push {
        payload: Option<serde_json::Value>,
    },
    NotificationClick {
        action: String,
    },
}

/// The offline-support engine.
///
/// One instance per process. The only shared mutable state is the store
/// itself and the lifecycle phase cell; in-flight requests share nothing
/// else.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    db: CacheDb,
    fetcher: Arc<dyn Fetch>,
    config: AppConfig,
    rules: ClassifierRules,
    offline_key: String,
    phase: Mutex<Phase>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Engine {
    /// Build an engine plus the receiving end of its outbound signals.
    pub fn new(
        db: CacheDb,
        fetcher: Arc<dyn Fetch>,
        config: AppConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Outbound>), Error> {
        let rules = ClassifierRules::from_config(&config);
        let offline_url = resolve(&config.origin, &config.offline_page)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let offline_key = WebRequest::get(offline_url.as_str())
            .cache_key()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let (outbound, signals) = mpsc::unbounded_channel();

        let engine = Self {
            inner: Arc::new(Inner {
                db,
                fetcher,
                config,
                rules,
                offline_key,
                phase: Mutex::new(Phase::New),
                outbound,
            }),
        };

        Ok((engine, signals))
    }

    /// The configured version string, as reported to GET_VERSION.
    pub fn version(&self) -> &str {
        &self.inner.config.cache_version
    }

    pub async fn phase(&self) -> Phase {
        *self.inner.phase.lock().await
    }

    /// Dispatch loop: consume host events until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
    }

    /// Handle a single event.
    pub async fn dispatch(&self, event: Event) {
        match event {
            Event::Install { done } => {
                let result = self.install().await;
                if let Err(e) = &result {
                    tracing::error!("install failed: {}", e);
                }
                if let Some(port) = done {
                    let _ = port.send(result);
                }
            }
            Event::Activate { done } => {
                let result = self.activate().await;
                if let Err(e) = &result {
                    tracing::error!("activation failed: {}", e);
                }
                if let Some(port) = done {
                    let _ = port.send(result);
                }
            }
            Event::Fetch { request, respond_to } => {
                let engine = self.clone();
                tokio::spawn(async move {
                    let result = engine.handle_fetch(&request).await;
                    // A dropped reply port is the page going away; the
                    // fetch is simply abandoned.
                    let _ = respond_to.send(result);
                });
            }
            Event::Message { payload, reply } => self.handle_message(payload, reply).await,
            Event::Sync { tag } => self.handle_sync(&tag),
            Event::Push { payload } => self.handle_push(payload.as_ref()),
            Event::NotificationClick { action } => self.handle_notification_click(&action),
        }
    }

    /// Install: pre-populate the current generation, then stand ready to
    /// take over without waiting for existing pages to be released.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let mut phase = self.inner.phase.lock().await;
        if *phase != Phase::New {
            return Err(Error::Lifecycle(format!("install event in phase {:?}", *phase)));
        }

        let report = lifecycle::install(&self.inner.db, self.inner.fetcher.clone(), &self.inner.config).await?;
        *phase = Phase::Installed;
        Ok(report)
    }

    /// Activate: garbage-collect stale generations, then claim all open
    /// page contexts immediately.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut phase = self.inner.phase.lock().await;
        if *phase != Phase::Installed {
            return Err(Error::Lifecycle(format!("activate event in phase {:?}", *phase)));
        }

        let report = lifecycle::activate(&self.inner.db, &self.inner.config).await?;
        *phase = Phase::Active;
        self.signal(Outbound::ClaimClients);
        Ok(report)
    }

    /// Serve one intercepted request through the classifier and the
    /// matching strategy. `Ok(None)` means the request is not ours to
    /// intercept.
    pub async fn handle_fetch(&self, request: &WebRequest) -> Result<Option<Served>, Error> {
        let class = classify(request, &self.inner.rules);
        if class == PolicyClass::Ignore {
            return Ok(None);
        }

        let store = self.inner.db.open_generation(&self.inner.config.generation_id()).await?;

        let served = if class == PolicyClass::Static {
            strategy::cache_first(&store, self.inner.fetcher.as_ref(), request, &self.inner.offline_key).await?
        } else {
            strategy::network_first(&store, self.inner.fetcher.as_ref(), request).await?
        };

        Ok(Some(served))
    }

    /// Handle a coordination message. Malformed input is dropped.
    pub async fn handle_message(&self, payload: serde_json::Value, reply: Option<oneshot::Sender<Outbound>>) {
        let Some(message) = parse_inbound(&payload) else {
            return;
        };

        match message {
            Inbound::SkipWaiting => {
                // Redundant promotion requests are normal; only a waiting
                // generation has anything to skip to.
                if self.phase().await == Phase::Installed {
                    if let Err(e) = self.activate().await {
                        tracing::error!("skip-waiting activation failed: {}", e);
                    }
                } else {
                    tracing::debug!("skip-waiting ignored: nothing waiting");
                }
            }
            Inbound::GetVersion => {
                Self::respond(reply, Outbound::Version { version: self.inner.config.cache_version.clone() });
            }
            Inbound::ClearCache => {
                let success = match self.inner.db.delete_generation(&self.inner.config.generation_id()).await {
                    Ok(entries) => {
                        tracing::info!("cleared {} cached entries", entries);
                        true
                    }
                    Err(e) => {
                        tracing::error!("cache clear failed: {}", e);
                        false
                    }
                };
                Self::respond(reply, Outbound::CacheCleared { success });
            }
        }
    }

    /// A background-sync trigger fired; delegate to the page for a known
    /// tag, ignore anything else.
    pub fn handle_sync(&self, tag: &str) {
        if self.inner.config.sync_tags.iter().any(|t| t == tag) {
            self.signal(Outbound::SyncRequested { timestamp: chrono::Utc::now().timestamp_millis() });
        } else {
            tracing::debug!("ignoring sync for unknown tag {}", tag);
        }
    }

    pub fn handle_push(&self, payload: Option<&serde_json::Value>) {
        if let Some(signal) = notify::on_push(payload, &self.inner.config.notification) {
            self.signal(signal);
        }
    }

    pub fn handle_notification_click(&self, action: &str) {
        if let Some(signal) = notify::on_notification_click(action, &self.inner.config.start_url) {
            self.signal(signal);
        }
    }

    fn respond(reply: Option<oneshot::Sender<Outbound>>, message: Outbound) {
        if let Some(port) = reply {
            let _ = port.send(message);
        }
    }

    fn signal(&self, message: Outbound) {
        // The outbound channel closes only when the host is shutting down.
        let _ = self.inner.outbound.send(message);
    }
}
