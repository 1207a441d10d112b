//! Single-unit fetch: cache check, fetch, parse, write-through.
//!
//! This function performs at most one network call and one cache write per
//! invocation and never retries internally; transient-network retry policy
//! belongs to the transport client, and a malformed page will not
//! self-correct, so parse failures are terminal for the unit.

use crate::error::{FetchError, ParseError};
use crate::store::{self, RaceStore, StoreKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Where a fetched record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Network,
}

/// A typed record tagged with its source.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub record: T,
    pub source: DataSource,
}

impl<T> Fetched<T> {
    pub fn from_cache(&self) -> bool {
        self.source == DataSource::Cache
    }
}

/// Fetch one unit: cache hit short-circuits, a miss fetches, parses and
/// writes through.
///
/// A cache read error degrades to a miss; a cache write error is logged and
/// the freshly parsed record is still returned.
pub async fn fetch_unit<T, F, Fut, P>(
    store: &dyn RaceStore,
    key: &StoreKey,
    fetch_fn: F,
    parse_fn: P,
) -> Result<Fetched<T>, FetchError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
    P: FnOnce(&str) -> Result<T, ParseError>,
{
    match store::get_record::<T>(store, key) {
        Ok(Some(record)) => {
            tracing::debug!("cache hit for {}", key);
            return Ok(Fetched {
                record,
                source: DataSource::Cache,
            });
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("store read failed for {}, falling back to fetch: {}", key, e);
        }
    }

    let raw = fetch_fn().await?;
    let record = parse_fn(&raw)?;

    if let Err(e) = store::put_record(store, key, &record) {
        tracing::warn!("store write failed for {}: {}", key, e);
    }

    Ok(Fetched {
        record,
        source: DataSource::Network,
    })
}
