//! Chain registry and adapter facade
//!
//! The registry owns the descriptor list loaded at startup, a lazy
//! `(family, network) → adapter` cache, and the per-URL HTTP client cache.
//! It is an owned component handed to callers, not a process-global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::algorand::AlgorandAdapter;
use crate::aptos::AptosAdapter;
use crate::bitcoin::BitcoinAdapter;
use crate::cardano::CardanoAdapter;
use crate::chain::Blockchain;
use crate::error::{AdapterError, Result};
use crate::evm::EvmAdapter;
use crate::http::HttpClientCache;
use crate::ripple::RippleAdapter;
use crate::stellar::StellarAdapter;
use crate::types::{ChainDescriptor, ChainFamily, NetworkType};

/// Process-wide registry of chain adapters
pub struct ChainRegistry {
    descriptors: Vec<ChainDescriptor>,
    adapters: Mutex<HashMap<(ChainFamily, NetworkType), Arc<dyn Blockchain>>>,
    http: HttpClientCache,
}

impl ChainRegistry {
    /// Create a registry over startup-provided descriptors
    pub fn new(descriptors: Vec<ChainDescriptor>) -> Self {
        info!(chains = descriptors.len(), "Chain registry initialized");
        Self {
            descriptors,
            adapters: Mutex::new(HashMap::new()),
            http: HttpClientCache::new(),
        }
    }

    /// The descriptor registered for `(family, network)`
    pub fn descriptor(
        &self,
        family: ChainFamily,
        network: NetworkType,
    ) -> Result<&ChainDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.family == family && d.network == network)
            .ok_or_else(|| {
                AdapterError::InvalidInput(format!(
                    "no chain registered for {} {}",
                    family, network
                ))
            })
    }

    /// Look up a descriptor by its stable chain id
    pub fn descriptor_by_id(&self, chain_id: &str) -> Result<&ChainDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.chain_id == chain_id)
            .ok_or_else(|| AdapterError::InvalidInput(format!("unknown chain id: {}", chain_id)))
    }

    /// The adapter for `(family, network)`, constructed on first request
    ///
    /// Construction runs under the cache mutex, so concurrent first
    /// requests still produce a single shared instance.
    pub fn get(&self, family: ChainFamily, network: NetworkType) -> Result<Arc<dyn Blockchain>> {
        let mut adapters = self
            .adapters
            .lock()
            .map_err(|_| AdapterError::Network("adapter cache poisoned".into()))?;

        if let Some(adapter) = adapters.get(&(family, network)) {
            return Ok(adapter.clone());
        }

        let descriptor = self.descriptor(family, network)?;
        url::Url::parse(&descriptor.node_url).map_err(|e| {
            AdapterError::InvalidInput(format!("bad node url {}: {}", descriptor.node_url, e))
        })?;

        let adapter: Arc<dyn Blockchain> = match family {
            ChainFamily::Algorand => Arc::new(AlgorandAdapter::new(descriptor, &self.http)?),
            ChainFamily::Aptos => Arc::new(AptosAdapter::new(descriptor, &self.http)?),
            ChainFamily::Bitcoin => Arc::new(BitcoinAdapter::new(descriptor, &self.http)?),
            ChainFamily::Cardano => Arc::new(CardanoAdapter::new(descriptor, &self.http)?),
            ChainFamily::Ripple => Arc::new(RippleAdapter::new(descriptor, &self.http)?),
            ChainFamily::Stellar => Arc::new(StellarAdapter::new(descriptor, &self.http)?),
            ChainFamily::Evm => Arc::new(EvmAdapter::new(descriptor, &self.http)?),
        };

        info!(family = %family, network = %network, "Chain adapter constructed");
        adapters.insert((family, network), adapter.clone());
        Ok(adapter)
    }

    /// The adapter addressed by a descriptor's stable chain id
    pub fn get_by_id(&self, chain_id: &str) -> Result<Arc<dyn Blockchain>> {
        let descriptor = self.descriptor_by_id(chain_id)?;
        self.get(descriptor.family, descriptor.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyCurve;

    fn descriptor(family: ChainFamily, network: NetworkType) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: format!("{}-{}", family, network),
            family,
            network,
            node_url: "http://localhost:18443".into(),
            indexer_url: None,
            credentials: None,
            key_curve: match family {
                ChainFamily::Bitcoin | ChainFamily::Evm => KeyCurve::Secp256k1,
                _ => KeyCurve::Ed25519,
            },
            signing_encoding: "hex".into(),
            token_symbol: "TEST".into(),
            request_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_lazy_singleton_per_chain() {
        let registry = ChainRegistry::new(vec![
            descriptor(ChainFamily::Bitcoin, NetworkType::Devnet),
            descriptor(ChainFamily::Stellar, NetworkType::Testnet),
        ]);

        let a = registry.get(ChainFamily::Bitcoin, NetworkType::Devnet).unwrap();
        let b = registry.get(ChainFamily::Bitcoin, NetworkType::Devnet).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.chain_name(), ChainFamily::Bitcoin);
        assert_eq!(a.key_curve(), KeyCurve::Secp256k1);

        let stellar = registry
            .get(ChainFamily::Stellar, NetworkType::Testnet)
            .unwrap();
        assert_eq!(stellar.chain_name(), ChainFamily::Stellar);
        assert_eq!(stellar.key_curve(), KeyCurve::Ed25519);
    }

    #[tokio::test]
    async fn test_unregistered_chain_rejected() {
        let registry = ChainRegistry::new(vec![]);
        assert!(matches!(
            registry.get(ChainFamily::Algorand, NetworkType::Mainnet),
            Err(AdapterError::InvalidInput(_))
        ));
        assert!(registry.get_by_id("nope").is_err());
    }

    #[tokio::test]
    async fn test_bad_node_url_rejected_at_construction() {
        let mut bad = descriptor(ChainFamily::Stellar, NetworkType::Mainnet);
        bad.node_url = "not a url".into();
        let registry = ChainRegistry::new(vec![bad]);
        assert!(matches!(
            registry.get(ChainFamily::Stellar, NetworkType::Mainnet),
            Err(AdapterError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_chain_id() {
        let registry = ChainRegistry::new(vec![descriptor(
            ChainFamily::Ripple,
            NetworkType::Mainnet,
        )]);
        let adapter = registry.get_by_id("ripple-mainnet").unwrap();
        assert_eq!(adapter.chain_name(), ChainFamily::Ripple);
    }
}
