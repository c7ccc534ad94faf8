// User-facing operations: login, profile update, profile lookup

use std::sync::Arc;

use async_trait::async_trait;
use steward_common::{Result, StewardError, User};
use steward_persistence::{NewUser, ProfileUpdate};
use tracing::{debug, info};

use super::identity::IdentityVerifier;
use crate::metrics;
use crate::repository::UserRepository;

#[async_trait]
pub trait UserService: Send + Sync {
    /// Verify credentials, then fetch the user, creating it on first login
    async fn login(&self, external_id: &str, secret: &str) -> Result<User>;

    /// Change the nickname and avatar of a user
    async fn update_non_sensitive_info(&self, update: ProfileUpdate) -> Result<()>;

    async fn profile(&self, id: i64) -> Result<User>;
}

pub struct DefaultUserService {
    repo: Arc<dyn UserRepository>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl DefaultUserService {
    pub fn new(repo: Arc<dyn UserRepository>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { repo, verifier }
    }
}

#[async_trait]
impl UserService for DefaultUserService {
    async fn login(&self, external_id: &str, secret: &str) -> Result<User> {
        if !self.verifier.verify(external_id, secret).await? {
            metrics::record_login("rejected");
            return Err(StewardError::InvalidCredentials);
        }

        match self.repo.find_by_external_id(external_id).await {
            Ok(user) => {
                metrics::record_login("existing");
                return Ok(user);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        // First login
        let outcome = match self.repo.create(NewUser::with_external_id(external_id)).await {
            Ok(id) => {
                info!(uid = id, external_id, "Provisioned user on first login");
                "provisioned"
            }
            Err(e) if e.is_duplicate() => {
                debug!(external_id, "Concurrent first login created the user");
                "existing"
            }
            Err(e) => return Err(e),
        };

        let user = self.repo.find_by_external_id(external_id).await?;
        metrics::record_login(outcome);
        Ok(user)
    }

    async fn update_non_sensitive_info(&self, update: ProfileUpdate) -> Result<()> {
        self.repo.update_profile(&update).await
    }

    async fn profile(&self, id: i64) -> Result<User> {
        self.repo.find_by_id(id).await
    }
}
