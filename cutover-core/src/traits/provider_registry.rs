//! Provider registry abstract Trait

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use cutover_provider::DnsProvider;

/// Provider Registry Trait
///
/// Maps a provider name (`"manual"`, `"cloudflare"`, ...) to a configured
/// provider instance. The orchestrator resolves the provider for each run
/// through this registry and never branches on the name itself.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Register a Provider instance, replacing any previous one with the same name
    async fn register(&self, name: String, provider: Arc<dyn DnsProvider>);

    /// Remove a Provider
    async fn unregister(&self, name: &str);

    /// Get Provider instance
    async fn get(&self, name: &str) -> Option<Arc<dyn DnsProvider>>;

    /// List all registered names
    async fn list_names(&self) -> Vec<String>;
}

/// In-memory Provider registry
#[derive(Clone)]
pub struct InMemoryProviderRegistry {
    providers: Arc<RwLock<HashMap<String, Arc<dyn DnsProvider>>>>,
}

impl InMemoryProviderRegistry {
    /// Create a new memory registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderRegistry for InMemoryProviderRegistry {
    async fn register(&self, name: String, provider: Arc<dyn DnsProvider>) {
        self.providers.write().await.insert(name, provider);
    }

    async fn unregister(&self, name: &str) {
        self.providers.write().await.remove(name);
    }

    async fn get(&self, name: &str) -> Option<Arc<dyn DnsProvider>> {
        self.providers.read().await.get(name).cloned()
    }

    async fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
