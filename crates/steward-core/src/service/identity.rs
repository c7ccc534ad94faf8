// Credential verification against an identity provider

use async_trait::async_trait;
use dashmap::DashMap;
use steward_common::Result;

/// Checks an external id and secret with the identity provider.
///
/// `Ok(false)` means the credentials were rejected. `Err` means the provider
/// could not answer.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, external_id: &str, secret: &str) -> Result<bool>;
}

/// Verifier backed by a fixed credential table, for standalone deployments
#[derive(Default)]
pub struct StaticIdentityVerifier {
    credentials: DashMap<String, String>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(self, external_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials.insert(external_id.into(), secret.into());
        self
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, external_id: &str, secret: &str) -> Result<bool> {
        Ok(self
            .credentials
            .get(external_id)
            .is_some_and(|expected| expected.value() == secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_verifier() {
        let verifier = StaticIdentityVerifier::new().with_credential("2021213001", "pw");
        assert_eq!(verifier.len(), 1);
        assert!(verifier.verify("2021213001", "pw").await.unwrap());
        assert!(!verifier.verify("2021213001", "wrong").await.unwrap());
        assert!(!verifier.verify("2021213002", "pw").await.unwrap());
    }
}
