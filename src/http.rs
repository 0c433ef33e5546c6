//! Shared HTTP plumbing for the chain clients
//!
//! One `reqwest::Client` exists per node URL; the cache is insert-only and
//! guarded by a mutex so that concurrent first requests against the same
//! endpoint still create a single client. Idempotent reads may be retried
//! exactly once on transport failure; writes are never retried.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

/// Mutex-guarded `node_url → reqwest::Client` cache
#[derive(Default)]
pub struct HttpClientCache {
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl HttpClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the client for `node_url`, creating it on first use
    ///
    /// Creation is idempotent under concurrent entry: the mutex is held
    /// across the lookup-or-insert, so exactly one client per URL exists.
    pub fn get_or_create(&self, node_url: &str, timeout: Duration) -> Result<reqwest::Client> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| AdapterError::Network("http client cache poisoned".into()))?;

        if let Some(client) = clients.get(node_url) {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Network(format!("failed to create HTTP client: {}", e)))?;

        debug!(node_url = %node_url, timeout_secs = timeout.as_secs(), "Created HTTP client");
        clients.insert(node_url.to_string(), client.clone());
        Ok(client)
    }
}

/// Run an idempotent read, retrying exactly once on a transport failure
pub async fn retry_once<T, F, Fut>(operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match operation().await {
        Err(err) if err.is_transient() => {
            warn!(error = %err, "Transient endpoint failure, retrying read once");
            operation().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_client_cache_is_per_url() {
        let cache = HttpClientCache::new();
        let timeout = Duration::from_secs(5);
        cache.get_or_create("http://localhost:8545", timeout).unwrap();
        cache.get_or_create("http://localhost:8545", timeout).unwrap();
        cache.get_or_create("http://localhost:9650", timeout).unwrap();

        assert_eq!(cache.clients.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_once_retries_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = retry_once(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(AdapterError::Network("connection reset".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_once_does_not_retry_rejections() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = retry_once(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AdapterError::ChainRejected("tefPAST_SEQ".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
