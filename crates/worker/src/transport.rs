//! Newline-delimited JSON host transport.
//!
//! The host platform delivers events as single-line JSON envelopes on
//! stdin; replies and outbound coordination signals leave as single-line
//! JSON on stdout. Response bodies are hex-encoded on the wire. Logging
//! goes to stderr so the protocol stream stays clean.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use swkit_client::fetch::WebRequest;
use swkit_core::Error;

use crate::engine::{Engine, Event};
use crate::messages::Outbound;
use crate::strategy::Served;

/// One platform event as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
pub enum HostEvent {
    #[serde(rename = "INSTALL")]
    Install,
    #[serde(rename = "ACTIVATE")]
    Activate,
    #[serde(rename = "FETCH")]
    Fetch { request: WebRequest },
    #[serde(rename = "MESSAGE")]
    Message { payload: serde_json::Value },
    #[serde(rename = "SYNC")]
    Sync { tag: String },
    #[serde(rename = "PUSH")]
    Push {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    #[serde(rename = "NOTIFICATION_CLICK")]
    NotificationClick { action: String },
}

/// Lines written back to the host (besides pass-through [`Outbound`]
/// signals, which carry their own `type` tags).
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum HostReply {
    #[serde(rename = "FETCH_RESULT")]
    FetchResult {
        status: u16,
        headers: Vec<(String, String)>,
        body_hex: String,
        source: &'static str,
    },
    /// The request was not ours; the host forwards it natively.
    #[serde(rename = "FETCH_PASSTHROUGH")]
    FetchPassthrough,
    #[serde(rename = "FETCH_ERROR")]
    FetchError { error: String },
    #[serde(rename = "INSTALLED")]
    Installed { generation: String, cached: usize },
    #[serde(rename = "INSTALL_FAILED")]
    InstallFailed { error: String },
    #[serde(rename = "ACTIVATED")]
    Activated { generation: String, removed: Vec<String> },
    #[serde(rename = "ACTIVATE_FAILED")]
    ActivateFailed { error: String },
}

impl HostReply {
    fn from_fetch(result: Result<Option<Served>, Error>) -> Self {
        match result {
            Ok(Some(served)) => HostReply::FetchResult {
                status: served.status,
                headers: served.headers,
                body_hex: hex::encode(&served.body),
                source: served.source.as_str(),
            },
            Ok(None) => HostReply::FetchPassthrough,
            Err(e) => HostReply::FetchError { error: e.to_string() },
        }
    }
}

/// Run the engine against stdin/stdout until stdin closes.
pub async fn run(engine: Engine, signals: mpsc::UnboundedReceiver<Outbound>) -> std::io::Result<()> {
    let (events_tx, events_rx) = mpsc::channel::<Event>(64);
    let dispatch = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(events_rx).await })
    };

    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(out_rx));
    let forwarder = tokio::spawn(forward_signals(signals, out_tx.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event: HostEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("ignoring unparseable host event: {}", e);
                continue;
            }
        };
        deliver(event, &events_tx, &out_tx).await;
    }

    // stdin closed: stop taking events and let in-flight work drain.
    drop(events_tx);
    let _ = dispatch.await;
    drop(out_tx);
    forwarder.abort();
    let _ = writer.await;

    Ok(())
}

/// Turn one wire event into an engine event, wiring up reply ports.
async fn deliver(event: HostEvent, events: &mpsc::Sender<Event>, out: &mpsc::UnboundedSender<String>) {
    match event {
        HostEvent::Install => {
            let (done, rx) = oneshot::channel();
            send_event(events, Event::Install { done: Some(done) }).await;
            spawn_reply(out.clone(), async move {
                match rx.await.ok()? {
                    Ok(report) => {
                        Some(to_line(&HostReply::Installed { generation: report.generation, cached: report.cached }))
                    }
                    Err(e) => Some(to_line(&HostReply::InstallFailed { error: e.to_string() })),
                }
            });
        }
        HostEvent::Activate => {
            let (done, rx) = oneshot::channel();
            send_event(events, Event::Activate { done: Some(done) }).await;
            spawn_reply(out.clone(), async move {
                match rx.await.ok()? {
                    Ok(report) => {
                        Some(to_line(&HostReply::Activated { generation: report.generation, removed: report.removed }))
                    }
                    Err(e) => Some(to_line(&HostReply::ActivateFailed { error: e.to_string() })),
                }
            });
        }
        HostEvent::Fetch { request } => {
            let (respond_to, rx) = oneshot::channel();
            send_event(events, Event::Fetch { request, respond_to }).await;
            spawn_reply(out.clone(), async move {
                let result = rx.await.ok()?;
                Some(to_line(&HostReply::from_fetch(result)))
            });
        }
        HostEvent::Message { payload } => {
            let (reply, rx) = oneshot::channel();
            send_event(events, Event::Message { payload, reply: Some(reply) }).await;
            spawn_reply(out.clone(), async move {
                // One-directional messages never answer; the dropped port
                // just ends this task.
                let outbound = rx.await.ok()?;
                Some(to_line(&outbound))
            });
        }
        HostEvent::Sync { tag } => send_event(events, Event::Sync { tag }).await,
        HostEvent::Push { payload } => send_event(events, Event::Push { payload }).await,
        HostEvent::NotificationClick { action } => {
            send_event(events, Event::NotificationClick { action }).await;
        }
    }
}

async fn send_event(events: &mpsc::Sender<Event>, event: Event) {
    if events.send(event).await.is_err() {
        tracing::error!("engine dispatch loop is gone; dropping event");
    }
}

fn spawn_reply<F>(out: mpsc::UnboundedSender<String>, future: F)
where
    F: Future<Output = Option<String>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Some(line) = future.await {
            let _ = out.send(line);
        }
    });
}

fn to_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
}

async fn forward_signals(mut signals: mpsc::UnboundedReceiver<Outbound>, out: mpsc::UnboundedSender<String>) {
    while let Some(signal) = signals.recv().await {
        if out.send(to_line(&signal)).is_err() {
            break;
        }
    }
}

async fn write_lines(mut lines: mpsc::UnboundedReceiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.recv().await {
        if stdout.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        let _ = stdout.write_all(b"\n").await;
        let _ = stdout.flush().await;
    }
}
