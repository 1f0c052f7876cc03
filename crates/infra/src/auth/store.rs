//! In-memory credential store

use async_trait::async_trait;
use dashmap::DashMap;
use esi_core::CredentialStore;
use esi_domain::{Credential, Result};
use uuid::Uuid;

/// [`CredentialStore`] kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: DashMap<Uuid, Credential>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Credentials granted to `character_id` that include every scope in
    /// `scopes`.
    pub fn find(&self, character_id: i64, scopes: &[&str]) -> Vec<Credential> {
        self.credentials
            .iter()
            .filter(|entry| entry.character_id == character_id && entry.has_scopes(scopes))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn save(&self, credential: &Credential) -> Result<()> {
        self.credentials.insert(credential.id, credential.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Credential>> {
        Ok(self.credentials.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.credentials.remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Credential>> {
        Ok(self.credentials.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn save_replaces_by_id() {
        let store = InMemoryCredentialStore::new();
        let mut credential = Credential::new(1, "Pilot", "a", None, Utc::now());
        store.save(&credential).await.unwrap();

        credential.access_token = "b".into();
        store.save(&credential).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(credential.id).await.unwrap().unwrap().access_token, "b");

        store.delete(credential.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn find_filters_by_character_and_scope() {
        let store = InMemoryCredentialStore::new();
        let wallet = Credential::new(1, "Pilot", "a", None, Utc::now())
            .with_scopes(["esi-wallet.read_character_wallet.v1"]);
        let other = Credential::new(2, "Other", "a", None, Utc::now())
            .with_scopes(["esi-wallet.read_character_wallet.v1"]);
        store.save(&wallet).await.unwrap();
        store.save(&other).await.unwrap();

        let found = store.find(1, &["esi-wallet.read_character_wallet.v1"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, wallet.id);
        assert!(store.find(1, &["esi-mail.read_mail.v1"]).is_empty());
    }
}
