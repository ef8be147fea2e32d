use crate::error::AppError;
use remote_client::{InstanceConfig, PhotoRemote, RemoteClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;

/// Builds a client for one deployment
pub type Connector =
    Arc<dyn Fn(&InstanceConfig) -> Result<Arc<dyn PhotoRemote>, AppError> + Send + Sync>;

struct CachedClient {
    config: InstanceConfig,
    client: Arc<dyn PhotoRemote>,
}

/// Per-tenant cache of remote clients.
///
/// Created once at startup and shared as `Arc<ClientRegistry>`; reusing a
/// client reuses its session token. A cached client is only handed out while
/// it was built from the same instance config as the caller's.
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, CachedClient>>,
    connector: Connector,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// Registry building real HTTP clients
    pub fn new() -> Self {
        Self::with_connector(Arc::new(|config: &InstanceConfig| {
            let client = RemoteClient::new(config.clone())?;
            Ok(Arc::new(client) as Arc<dyn PhotoRemote>)
        }))
    }

    pub fn with_connector(connector: Connector) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            connector,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CachedClient>>, AppError> {
        self.clients
            .lock()
            .map_err(|_| AppError::Other("Client registry lock poisoned".to_string()))
    }

    /// Cached client for the tenant, built from `config` on first use.
    ///
    /// A cached client built from a different config (the tenant's active
    /// instance was replaced or edited) is dropped and rebuilt. Building does
    /// not authenticate.
    pub fn get_client_for_tenant(
        &self,
        tenant_id: &str,
        config: &InstanceConfig,
    ) -> Result<Arc<dyn PhotoRemote>, AppError> {
        let mut clients = self.lock()?;
        match clients.get(tenant_id) {
            Some(cached) if cached.config == *config => return Ok(cached.client.clone()),
            Some(cached) => log::info!(
                "Instance config of tenant {} changed ({} -> {}), rebuilding client",
                tenant_id,
                cached.config.base_url,
                config.base_url
            ),
            None => {}
        }
        let client = (self.connector)(config)?;
        log::debug!("Created remote client for tenant {} ({})", tenant_id, config.base_url);
        clients.insert(
            tenant_id.to_string(),
            CachedClient {
                config: config.clone(),
                client: client.clone(),
            },
        );
        Ok(client)
    }

    /// Drops the cached client, e.g. after the tenant's instance changed
    pub fn remove_client(&self, tenant_id: &str) -> bool {
        match self.lock() {
            Ok(mut clients) => clients.remove(tenant_id).is_some(),
            Err(e) => {
                log::error!("{}", e);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Probes every cached client concurrently.
    ///
    /// Each probe runs in its own task; a probe that panics reports false
    /// for its tenant only.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let snapshot: Vec<(String, Arc<dyn PhotoRemote>)> = match self.lock() {
            Ok(clients) => clients
                .iter()
                .map(|(tenant, cached)| (tenant.clone(), cached.client.clone()))
                .collect(),
            Err(e) => {
                log::error!("{}", e);
                return HashMap::new();
            }
        };

        let mut results: HashMap<String, bool> = snapshot
            .iter()
            .map(|(tenant, _)| (tenant.clone(), false))
            .collect();

        let mut join_set = JoinSet::new();
        for (tenant, client) in snapshot {
            join_set.spawn(async move {
                let healthy = client.health_check().await;
                (tenant, healthy)
            });
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((tenant, healthy)) => {
                    if !healthy {
                        log::warn!("Remote instance for tenant {} is unhealthy", tenant);
                    }
                    results.insert(tenant, healthy);
                }
                Err(e) => log::error!("Health probe task failed: {}", e),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRemote;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(url: &str) -> InstanceConfig {
        InstanceConfig {
            base_url: url.to_string(),
            username: "admin".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn test_client_is_built_once_per_tenant() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ClientRegistry::with_connector(Arc::new(move |_cfg: &InstanceConfig| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeRemote::new()) as Arc<dyn PhotoRemote>)
        }));

        let a = registry.get_client_for_tenant("school-1", &config("http://a")).unwrap();
        let b = registry.get_client_for_tenant("school-1", &config("http://a")).unwrap();
        registry.get_client_for_tenant("school-2", &config("http://b")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_changed_config_rebuilds_client() {
        let old = Arc::new(FakeRemote::new());
        let new = Arc::new(FakeRemote::new());
        let (old_client, new_client) = (old.clone(), new.clone());
        let registry = ClientRegistry::with_connector(Arc::new(move |cfg: &InstanceConfig| {
            let client = if cfg.base_url == "http://old" {
                old_client.clone()
            } else {
                new_client.clone()
            };
            Ok(client as Arc<dyn PhotoRemote>)
        }));

        let first = registry.get_client_for_tenant("school-1", &config("http://old")).unwrap();
        let second = registry.get_client_for_tenant("school-1", &config("http://new")).unwrap();
        let third = registry.get_client_for_tenant("school-1", &config("http://new")).unwrap();

        assert!(Arc::ptr_eq(&first, &(old as Arc<dyn PhotoRemote>)));
        assert!(Arc::ptr_eq(&second, &(new as Arc<dyn PhotoRemote>)));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_changed_credentials_rebuild_client() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ClientRegistry::with_connector(Arc::new(move |_cfg: &InstanceConfig| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeRemote::new()) as Arc<dyn PhotoRemote>)
        }));

        let mut cfg = config("http://a");
        registry.get_client_for_tenant("school-1", &cfg).unwrap();
        cfg.password = "rotated".to_string();
        registry.get_client_for_tenant("school-1", &cfg).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_client_forces_rebuild() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ClientRegistry::with_connector(Arc::new(move |_cfg: &InstanceConfig| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeRemote::new()) as Arc<dyn PhotoRemote>)
        }));

        registry.get_client_for_tenant("school-1", &config("http://a")).unwrap();
        assert!(registry.remove_client("school-1"));
        assert!(!registry.remove_client("school-1"));
        assert!(registry.is_empty());

        registry.get_client_for_tenant("school-1", &config("http://a2")).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_real_connector_builds_without_network() {
        let registry = ClientRegistry::new();
        assert!(registry
            .get_client_for_tenant("school-1", &config("http://127.0.0.1:9"))
            .is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_health_check_all_isolates_tenants() {
        let healthy = Arc::new(FakeRemote::new());
        let unhealthy = Arc::new(FakeRemote::new());
        unhealthy.set_healthy(false);
        let panicking = Arc::new(FakeRemote::new());
        panicking.set_health_panics(true);

        let clients: HashMap<String, Arc<FakeRemote>> = [
            ("school-1".to_string(), healthy),
            ("school-2".to_string(), unhealthy),
            ("school-3".to_string(), panicking),
        ]
        .into_iter()
        .collect();
        let registry = ClientRegistry::with_connector(Arc::new(move |cfg: &InstanceConfig| {
            let client = clients
                .get(&cfg.base_url)
                .cloned()
                .ok_or_else(|| AppError::NotFound(cfg.base_url.clone()))?;
            Ok(client as Arc<dyn PhotoRemote>)
        }));
        for tenant in ["school-1", "school-2", "school-3"] {
            registry.get_client_for_tenant(tenant, &config(tenant)).unwrap();
        }

        let results = registry.health_check_all().await;

        assert_eq!(results.len(), 3);
        assert_eq!(results["school-1"], true);
        assert_eq!(results["school-2"], false);
        assert_eq!(results["school-3"], false);
    }
}
