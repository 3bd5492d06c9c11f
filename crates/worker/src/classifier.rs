//! Request classification: which retrieval policy applies.

use swkit_client::fetch::{WebRequest, url::canonicalize};
use swkit_core::AppConfig;

/// Policy class for one request. Computed per request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyClass {
    /// Not ours to intercept (non-http scheme or unparseable URL); the
    /// host lets the request proceed unmodified.
    Ignore,
    /// Frequently-changing third-party service; always network-first.
    DynamicService,
    /// Application API call or write; network-first.
    Api,
    /// Everything else; cache-first.
    Static,
}

/// Matching rules, precomputed from configuration.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    dynamic_prefixes: Vec<String>,
    api_marker: String,
}

impl ClassifierRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            dynamic_prefixes: config.dynamic_prefixes.clone(),
            api_marker: config.api_marker.clone(),
        }
    }
}

/// Classify a request. First match wins, and the order is load-bearing:
/// a dynamic-service URL must never go cache-first even when it ends in
/// something that looks like a static asset.
pub fn classify(request: &WebRequest, rules: &ClassifierRules) -> PolicyClass {
    let url = match canonicalize(&request.url) {
        Ok(url) => url,
        Err(_) => return PolicyClass::Ignore,
    };

    // Substring containment, as the dynamic services serve from many
    // versioned paths under each prefix.
    let href = url.as_str();
    if rules.dynamic_prefixes.iter().any(|prefix| href.contains(prefix.as_str())) {
        return PolicyClass::DynamicService;
    }

    if url.path().contains(&rules.api_marker) || !request.method.eq_ignore_ascii_case("GET") {
        return PolicyClass::Api;
    }

    PolicyClass::Static
}
