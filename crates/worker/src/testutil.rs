//! Scripted fetch fake for exercising the engine without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use swkit_client::fetch::{Fetch, FetchResponse, WebRequest};
use swkit_core::Error;

/// What to do with one fetched URL.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Ok { status: u16, body: Vec<u8> },
    Fail(String),
}

/// A `Fetch` impl that answers from a script and counts calls.
pub(crate) struct ScriptedFetch {
    by_url: Mutex<HashMap<String, Script>>,
    fallback: Script,
    calls: AtomicUsize,
}

impl ScriptedFetch {
    /// Answer every URL with the same response.
    pub(crate) fn ok(status: u16, body: &[u8]) -> Self {
        Self {
            by_url: Mutex::new(HashMap::new()),
            fallback: Script::Ok { status, body: body.to_vec() },
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every URL at the transport level.
    pub(crate) fn failing() -> Self {
        Self {
            by_url: Mutex::new(HashMap::new()),
            fallback: Script::Fail("connection refused".into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Override the script for one exact URL.
    pub(crate) fn with_url(self, url: &str, script: Script) -> Self {
        self.by_url.lock().unwrap().insert(url.to_string(), script);
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, request: &WebRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = {
            let by_url = self.by_url.lock().unwrap();
            by_url.get(&request.url).unwrap_or(&self.fallback).clone()
        };
        match script {
            Script::Ok { status, body } => FetchResponse::from_parts(&request.url, status, None, body),
            Script::Fail(reason) => Err(Error::Network(reason)),
        }
    }
}
