//! Install-time pre-population and activation-time generation GC.
//!
//! Install fetches the static asset manifest with bounded concurrency and
//! persists it into the current generation. Activation deletes every other
//! generation; that is the system's only eviction mechanism, and it is
//! generation-granular by design of the source platform.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use swkit_client::fetch::{Fetch, WebRequest, resolve};
use swkit_core::cache::CacheDb;
use swkit_core::cache::store::CacheEntry;
use swkit_core::config::{AppConfig, PrecachePolicy};
use swkit_core::Error;

/// How many manifest assets fetch at once during install.
const PRECACHE_CONCURRENCY: usize = 4;

/// Outcome of a completed install.
#[derive(Debug)]
pub struct InstallReport {
    pub generation: String,
    pub cached: usize,
    /// Assets skipped under the best-effort policy.
    pub skipped: Vec<String>,
}

/// Outcome of activation.
#[derive(Debug)]
pub struct ActivationReport {
    pub generation: String,
    /// Stale generations removed.
    pub removed: Vec<String>,
}

/// Install: open the current generation and pre-populate it from the
/// static asset manifest.
///
/// The whole manifest is fetched before anything is persisted, so an
/// `all_or_nothing` failure leaves no partial generation behind: the old
/// generation stays active and the error names the asset that sank the
/// upgrade.
pub async fn install(db: &CacheDb, fetcher: Arc<dyn Fetch>, config: &AppConfig) -> Result<InstallReport, Error> {
    let generation = config.generation_id();
    tracing::info!("installing generation {}", generation);

    let store = db.open_generation(&generation).await?;

    let semaphore = Arc::new(Semaphore::new(PRECACHE_CONCURRENCY));
    let mut join_set = JoinSet::new();

    for path in config.precache_manifest.clone() {
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let fetcher = fetcher.clone();
        let origin = config.origin.clone();

        join_set.spawn(async move {
            // NOTE: Hold permit for task duration to enforce concurrency limit
            let _permit = permit;
            let result = precache_one(fetcher.as_ref(), &origin, &path).await;
            (path, result)
        });
    }

    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    while let Some(joined) = join_set.join_next().await {
        let (path, result) = joined.map_err(|e| Error::InstallFailed(e.to_string()))?;
        match result {
            Ok(entry) => entries.push(entry),
            Err(e) => match config.precache_policy {
                PrecachePolicy::AllOrNothing => {
                    join_set.shutdown().await;
                    return Err(Error::InstallFailed(format!("{path}: {e}")));
                }
                PrecachePolicy::BestEffort => {
                    tracing::warn!("skipping pre-cache asset {}: {}", path, e);
                    skipped.push(path);
                }
            },
        }
    }

    for entry in &entries {
        store.put(entry).await?;
    }

    tracing::info!("generation {} installed, {} assets cached", generation, entries.len());

    Ok(InstallReport { generation, cached: entries.len(), skipped })
}

async fn precache_one(fetcher: &dyn Fetch, origin: &str, path: &str) -> Result<CacheEntry, Error> {
    let url = resolve(origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = WebRequest::get(url.as_str());
    let response = fetcher.fetch(&request).await?;

    if !response.status.is_success() {
        return Err(Error::InstallFailed(format!(
            "{} returned status {}",
            path,
            response.status.as_u16()
        )));
    }

    let key = request.cache_key().map_err(|e| Error::InvalidUrl(e.to_string()))?;
    Ok(CacheEntry::new(
        key,
        "GET".to_string(),
        url.to_string(),
        response.status.as_u16(),
        response.header_pairs(),
        response.bytes.to_vec(),
    ))
}

/// Activate: delete every generation other than the current one.
///
/// After this returns, at most one generation is persisted; the engine
/// then claims all open page contexts without waiting for a reload.
pub async fn activate(db: &CacheDb, config: &AppConfig) -> Result<ActivationReport, Error> {
    let generation = config.generation_id();
    tracing::info!("activating generation {}", generation);

    let mut removed = Vec::new();
    for id in db.list_generations().await? {
        if id != generation {
            let entries = db.delete_generation(&id).await?;
            tracing::info!("deleted stale generation {} ({} entries)", id, entries);
            removed.push(id);
        }
    }

    Ok(ActivationReport { generation, removed })
}
