//! Assembly of the user service graph from configuration

use std::sync::Arc;

use steward_cache::{MokaUserCache, UserCache};
use steward_consistency::{DistributedLockService, MemoryLockService};
use steward_core::{
    CacheConsistencyUserRepository, DefaultUserService, IdentityVerifier, StaticIdentityVerifier,
    UserRepository, UserService,
};
use steward_persistence::{
    ExternalDbPersistService, MemoryPersistService, StorageMode, UserPersistence,
};
use tracing::info;

use crate::model::Configuration;

/// Every component of a running server
pub struct StewardServices {
    pub persistence: Arc<dyn UserPersistence>,
    pub cache: Arc<dyn UserCache>,
    pub locks: Arc<dyn DistributedLockService>,
    pub repository: Arc<dyn UserRepository>,
    pub user_service: Arc<dyn UserService>,
}

/// Build the service graph.
///
/// `verifier` defaults to the credential table in the configuration.
pub async fn build_services(
    configuration: &Configuration,
    verifier: Option<Arc<dyn IdentityVerifier>>,
) -> anyhow::Result<StewardServices> {
    let consistency = configuration.consistency_config()?;

    let storage_mode = configuration.persistence_mode()?;
    info!("Persistence mode: {}", storage_mode);
    let persistence: Arc<dyn UserPersistence> = match storage_mode {
        StorageMode::ExternalDb => Arc::new(ExternalDbPersistService::new(
            configuration.database_connection().await?,
        )),
        StorageMode::Standalone => Arc::new(MemoryPersistService::new()),
    };
    persistence.health_check().await?;

    let cache_config = configuration.cache_config();
    let cache: Arc<dyn UserCache> = Arc::new(MokaUserCache::new(&cache_config));

    let locks: Arc<dyn DistributedLockService> = Arc::new(
        MemoryLockService::new().with_cleanup(consistency.lock.cleanup_interval_ms),
    );

    info!(
        namespace = %consistency.lock.namespace,
        lease_ms = consistency.lock.ttl_ms,
        wait_ms = consistency.lock.wait_ms,
        local_gate = consistency.local_gate,
        cache_ttl_secs = cache_config.ttl.as_secs(),
        "Cache consistency layer configured"
    );

    let repository: Arc<dyn UserRepository> = Arc::new(CacheConsistencyUserRepository::new(
        persistence.clone(),
        cache.clone(),
        locks.clone(),
        consistency,
    ));

    let verifier: Arc<dyn IdentityVerifier> = match verifier {
        Some(verifier) => verifier,
        None => {
            let table = configuration
                .identity_credentials()
                .into_iter()
                .fold(StaticIdentityVerifier::new(), |v, (id, secret)| {
                    v.with_credential(id, secret)
                });
            info!(credentials = table.len(), "Using configured identity table");
            Arc::new(table)
        }
    };

    let user_service: Arc<dyn UserService> =
        Arc::new(DefaultUserService::new(repository.clone(), verifier));

    Ok(StewardServices {
        persistence,
        cache,
        locks,
        repository,
        user_service,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_persistence::ProfileUpdate;

    fn standalone_config(dir: &tempfile::TempDir) -> Configuration {
        let path = dir.path().join("application.yml");
        std::fs::write(
            &path,
            "steward:\n  identity:\n    credentials:\n      \"2021213001\": secret\n",
        )
        .unwrap();
        Configuration::load(&path, Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn test_standalone_graph_serves_login_and_profile() {
        let dir = tempfile::tempdir().unwrap();
        let services = build_services(&standalone_config(&dir), None).await.unwrap();
        assert_eq!(
            services.persistence.storage_mode(),
            StorageMode::Standalone
        );

        let user = services
            .user_service
            .login("2021213001", "secret")
            .await
            .unwrap();
        assert!(user.is_new);

        services
            .user_service
            .update_non_sensitive_info(ProfileUpdate::new(user.id, "Alice", "a.png"))
            .await
            .unwrap();
        let profile = services.user_service.profile(user.id).await.unwrap();
        assert_eq!(profile.nickname, "Alice");
    }

    #[tokio::test]
    async fn test_unknown_credentials_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let services = build_services(&standalone_config(&dir), None).await.unwrap();
        let err = services
            .user_service
            .login("2021213001", "nope")
            .await
            .unwrap_err();
        assert!(err.is_user_facing());
    }

    #[tokio::test]
    async fn test_external_db_requires_url() {
        let dir = tempfile::tempdir().unwrap();
        let configuration = Configuration::load(
            dir.path().join("absent.yml"),
            vec![(crate::model::constants::PERSISTENCE_MODE, "external_db".to_string())],
        )
        .unwrap();
        assert!(build_services(&configuration, None).await.is_err());
    }
}
