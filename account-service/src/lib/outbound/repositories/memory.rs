use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::account::errors::StoreError;
use crate::account::errors::UniqueKey;
use crate::account::models::Identity;
use crate::account::models::IdentityId;
use crate::account::models::ResetTicket;
use crate::account::models::ResetTicketId;
use crate::account::models::SessionToken;
use crate::account::ports::AccountStore;
use crate::account::ports::IdentityStore;
use crate::account::ports::ResetTicketStore;
use crate::account::ports::SessionStore;
use crate::account::ports::StoreTransaction;

#[derive(Debug, Clone, Default)]
struct State {
    identities: HashMap<IdentityId, Identity>,
    sessions: HashMap<String, SessionToken>,
    reset_tickets: HashMap<ResetTicketId, ResetTicket>,
}

impl State {
    fn insert_identity(&mut self, identity: &Identity) -> Result<(), StoreError> {
        if self.identities.contains_key(&identity.id) {
            return Err(StoreError::Conflict(UniqueKey::IdentityId));
        }
        self.check_unique_profile(identity)?;
        self.identities
            .insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    fn update_profile(&mut self, identity: &Identity) -> Result<(), StoreError> {
        if !self.identities.contains_key(&identity.id) {
            return Err(StoreError::NotFound(identity.id.to_string()));
        }
        self.check_unique_profile(identity)?;

        let stored = self.stored_identity(&identity.id)?;
        stored.email = identity.email.clone();
        stored.display_name = identity.display_name.clone();
        stored.avatar_link = identity.avatar_link.clone();
        stored.updated_at = identity.updated_at;
        Ok(())
    }

    fn set_password_hash(
        &mut self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let stored = self.stored_identity(id)?;
        stored.password_hash = password_hash.to_string();
        stored.updated_at = updated_at;
        Ok(())
    }

    fn stored_identity(&mut self, id: &IdentityId) -> Result<&mut Identity, StoreError> {
        self.identities
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn check_unique_profile(&self, identity: &Identity) -> Result<(), StoreError> {
        for other in self.identities.values().filter(|o| o.id != identity.id) {
            if other.email == identity.email {
                return Err(StoreError::Conflict(UniqueKey::Email));
            }
            if other.nickname == identity.nickname {
                return Err(StoreError::Conflict(UniqueKey::Nickname));
            }
        }
        Ok(())
    }

    fn insert_session(&mut self, session: &SessionToken) -> Result<(), StoreError> {
        if self.sessions.contains_key(&session.value) {
            return Err(StoreError::Conflict(UniqueKey::SessionValue));
        }
        self.sessions.insert(session.value.clone(), session.clone());
        Ok(())
    }

    fn consume_ticket(&mut self, id: &ResetTicketId) -> Result<bool, StoreError> {
        let ticket = self
            .reset_tickets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if ticket.used {
            return Ok(false);
        }
        ticket.used = true;
        Ok(true)
    }
}

/// Process-local account store.
///
/// Enforces the same uniqueness rules as the relational schema. A transaction
/// holds the store lock until it finishes, so transactions are serialised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryAccountStore {
    async fn create_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.state.lock().await.insert_identity(identity)
    }

    async fn find_identity_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, StoreError> {
        Ok(self.state.lock().await.identities.get(id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .identities
            .values()
            .find(|i| i.email.as_str() == email)
            .cloned())
    }

    async fn find_identity_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .identities
            .values()
            .find(|i| i.nickname.as_str() == nickname)
            .cloned())
    }

    async fn update_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.state.lock().await.update_profile(identity)
    }

    async fn set_password_hash(
        &self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .set_password_hash(id, password_hash, updated_at)
    }
}

#[async_trait]
impl SessionStore for InMemoryAccountStore {
    async fn create_session(&self, session: &SessionToken) -> Result<(), StoreError> {
        self.state.lock().await.insert_session(session)
    }

    async fn find_session_by_value(
        &self,
        value: &str,
    ) -> Result<Option<SessionToken>, StoreError> {
        Ok(self.state.lock().await.sessions.get(value).cloned())
    }
}

#[async_trait]
impl ResetTicketStore for InMemoryAccountStore {
    async fn create_reset_ticket(&self, ticket: &ResetTicket) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.reset_tickets.contains_key(&ticket.id) {
            return Err(StoreError::Conflict(UniqueKey::Other));
        }
        if state
            .reset_tickets
            .values()
            .any(|t| t.secret == ticket.secret)
        {
            return Err(StoreError::Conflict(UniqueKey::TicketSecret));
        }
        state.reset_tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    async fn find_reset_ticket_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<ResetTicket>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .reset_tickets
            .values()
            .find(|t| t.secret == secret)
            .cloned())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            snapshot: Some(snapshot),
        })
    }
}

/// Transaction over [`InMemoryAccountStore`].
///
/// Writes apply to the locked state directly; the snapshot taken at `begin`
/// is restored unless the transaction commits.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    snapshot: Option<State>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn create_identity(&mut self, identity: &Identity) -> Result<(), StoreError> {
        self.guard.insert_identity(identity)
    }

    async fn set_password_hash(
        &mut self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.guard.set_password_hash(id, password_hash, updated_at)
    }

    async fn create_session(&mut self, session: &SessionToken) -> Result<(), StoreError> {
        self.guard.insert_session(session)
    }

    async fn mark_reset_ticket_used(&mut self, id: &ResetTicketId) -> Result<bool, StoreError> {
        self.guard.consume_ticket(id)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        drop(self);
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::models::EmailAddress;
    use crate::account::models::Nickname;
    use crate::account::models::SessionTokenId;

    fn identity(id: &str, email: &str, nickname: &str) -> Identity {
        let now = Utc::now();
        Identity {
            id: IdentityId(id.to_string()),
            password_hash: "$argon2id$test_hash".to_string(),
            nickname: Nickname::new(nickname.to_string()).unwrap(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            display_name: None,
            avatar_link: None,
            premium: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn session(id: &str, value: &str, identity_id: &str) -> SessionToken {
        let now = Utc::now();
        SessionToken {
            id: SessionTokenId(id.to_string()),
            value: value.to_string(),
            identity_id: IdentityId(identity_id.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_unique_email_and_nickname() {
        let store = InMemoryAccountStore::new();
        store
            .create_identity(&identity("id1", "a@x.com", "alice"))
            .await
            .unwrap();

        let same_email = store
            .create_identity(&identity("id2", "a@x.com", "bob"))
            .await;
        assert!(matches!(
            same_email,
            Err(StoreError::Conflict(UniqueKey::Email))
        ));

        let same_nickname = store
            .create_identity(&identity("id3", "b@x.com", "alice"))
            .await;
        assert!(matches!(
            same_nickname,
            Err(StoreError::Conflict(UniqueKey::Nickname))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_identity() {
        let store = InMemoryAccountStore::new();
        let result = store
            .update_identity(&identity("id1", "a@x.com", "alice"))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_profile_update_keeps_stored_credentials_and_premium() {
        let store = InMemoryAccountStore::new();
        let mut stored = identity("id1", "a@x.com", "alice");
        stored.premium = true;
        store.create_identity(&stored).await.unwrap();

        let mut stale = identity("id1", "new@x.com", "alice");
        stale.password_hash = "$argon2id$stale".to_string();
        stale.display_name = Some("Alice".to_string());
        store.update_identity(&stale).await.unwrap();

        let updated = store
            .find_identity_by_id(&IdentityId("id1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(updated.premium);
        assert_eq!(updated.password_hash, "$argon2id$test_hash");
        assert_eq!(updated.email.as_str(), "new@x.com");
        assert_eq!(updated.display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_set_password_hash_touches_only_the_hash() {
        let store = InMemoryAccountStore::new();
        let mut stored = identity("id1", "a@x.com", "alice");
        stored.premium = true;
        store.create_identity(&stored).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.set_password_hash(&stored.id, "$argon2id$new", Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let updated = store.find_identity_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "$argon2id$new");
        assert!(updated.premium);

        let missing = store
            .set_password_hash(&IdentityId("ghost".to_string()), "$argon2id$new", Utc::now())
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = InMemoryAccountStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_identity(&identity("id1", "a@x.com", "alice"))
            .await
            .unwrap();
        tx.create_session(&session("s1", "value-1", "id1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(store
            .find_identity_by_email("a@x.com")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_session_by_value("value-1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = InMemoryAccountStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_identity(&identity("id1", "a@x.com", "alice"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(store
            .find_identity_by_id(&IdentityId("id1".to_string()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = InMemoryAccountStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_session(&session("s1", "value-1", "id1"))
                .await
                .unwrap();
        }

        assert!(store
            .find_session_by_value("value-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_ticket_is_consumed_once() {
        let store = InMemoryAccountStore::new();
        let ticket = ResetTicket {
            id: ResetTicketId("t1".to_string()),
            secret: "secret-1".to_string(),
            identity_id: IdentityId("id1".to_string()),
            created_at: Utc::now(),
            used: false,
        };
        store.create_reset_ticket(&ticket).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.mark_reset_ticket_used(&ticket.id).await.unwrap());
        assert!(!tx.mark_reset_ticket_used(&ticket.id).await.unwrap());
        tx.commit().await.unwrap();

        let stored = store
            .find_reset_ticket_by_secret("secret-1")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.used);
    }
}
