use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::errors::EmailError;
use crate::account::errors::StoreError;
use crate::account::errors::UniqueKey;
use crate::account::models::AuthenticatedSession;
use crate::account::models::EmailAddress;
use crate::account::models::Identity;
use crate::account::models::IdentityId;
use crate::account::models::Nickname;
use crate::account::models::Password;
use crate::account::models::ResetTicket;
use crate::account::models::ResetTicketId;
use crate::account::models::SessionToken;
use crate::account::models::SessionTokenId;
use crate::account::models::UpdateProfileCommand;
use crate::account::ports::AccountServicePort;
use crate::account::ports::AccountStore;
use crate::account::ports::IdGenerator;
use crate::account::ports::PasswordHasher;
use crate::account::ports::StoreTransaction;

/// Domain service implementation for the credential lifecycle.
///
/// Owns every invariant and every transaction boundary; storage, hashing and
/// id generation are injected.
pub struct AccountService<S, H, G>
where
    S: AccountStore,
    H: PasswordHasher,
    G: IdGenerator,
{
    store: Arc<S>,
    password_hasher: Arc<H>,
    id_generator: Arc<G>,
}

impl<S, H, G> AccountService<S, H, G>
where
    S: AccountStore,
    H: PasswordHasher,
    G: IdGenerator,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Identity, session and reset ticket persistence
    /// * `password_hasher` - Adaptive one-way hash
    /// * `id_generator` - Identifier and secret source
    pub fn new(store: Arc<S>, password_hasher: Arc<H>, id_generator: Arc<G>) -> Self {
        Self {
            store,
            password_hasher,
            id_generator,
        }
    }

    fn new_session(
        &self,
        identity_id: &IdentityId,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AccountError> {
        Ok(SessionToken {
            id: SessionTokenId(self.id_generator.generate()?),
            value: self.id_generator.generate_secret()?,
            identity_id: identity_id.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Load the stored identity, which may differ from a caller's copy in
    /// fields the service never writes.
    async fn find_identity(
        &self,
        id: &IdentityId,
        operation: &'static str,
    ) -> Result<Identity, AccountError> {
        self.store
            .find_identity_by_id(id)
            .await
            .map_err(|e| AccountError::persistence(operation, e))?
            .ok_or_else(|| AccountError::NotFound(id.to_string()))
    }

    /// Roll back after a failed write and hand the original failure back.
    async fn abort(
        tx: S::Transaction,
        operation: &'static str,
        error: AccountError,
    ) -> AccountError {
        if let Err(e) = tx.rollback().await {
            tracing::error!(operation, error = %e, "Transaction rollback failed");
        }
        error
    }

    async fn write_registration(
        tx: &mut S::Transaction,
        identity: &Identity,
        session: &SessionToken,
    ) -> Result<(), AccountError> {
        tx.create_identity(identity)
            .await
            .map_err(|e| identity_write_error("register", identity, e))?;
        tx.create_session(session)
            .await
            .map_err(|e| AccountError::persistence("register", e))
    }

    async fn write_reset(
        tx: &mut S::Transaction,
        ticket: &ResetTicket,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let consumed = tx
            .mark_reset_ticket_used(&ticket.id)
            .await
            .map_err(|e| AccountError::persistence("consume_reset_ticket", e))?;
        if !consumed {
            return Err(AccountError::ResetTicketUsed);
        }

        tx.set_password_hash(&ticket.identity_id, password_hash, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => AccountError::NotFound(id),
                other => AccountError::persistence("consume_reset_ticket", other),
            })
    }
}

/// Map a failed identity insert/update, surfacing uniqueness races as conflicts.
fn identity_write_error(
    operation: &'static str,
    identity: &Identity,
    error: StoreError,
) -> AccountError {
    match error {
        StoreError::Conflict(UniqueKey::Email) => AccountError::EmailAlreadyRegistered,
        StoreError::Conflict(UniqueKey::Nickname) => {
            AccountError::NicknameTaken(identity.nickname.to_string())
        }
        StoreError::NotFound(_) => AccountError::NotFound(identity.id.to_string()),
        other => AccountError::persistence(operation, other),
    }
}

#[async_trait]
impl<S, H, G> AccountServicePort for AccountService<S, H, G>
where
    S: AccountStore,
    H: PasswordHasher,
    G: IdGenerator,
{
    async fn register(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AccountError> {
        let email = EmailAddress::new(email.to_string())?;
        let password = Password::new(password)?;
        let nickname = Nickname::new(nickname.to_string())?;

        let existing = self
            .store
            .find_identity_by_email(email.as_str())
            .await
            .map_err(|e| AccountError::persistence("register", e))?;
        if existing.is_some() {
            return Err(AccountError::EmailAlreadyRegistered);
        }

        let password_hash = self.password_hasher.hash(password.expose())?;
        let now = Utc::now();
        let identity = Identity {
            id: IdentityId(self.id_generator.generate()?),
            password_hash,
            nickname,
            email,
            display_name: None,
            avatar_link: None,
            premium: false,
            created_at: now,
            updated_at: now,
        };
        let session = self.new_session(&identity.id, now)?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| AccountError::persistence("register", e))?;
        if let Err(e) = Self::write_registration(&mut tx, &identity, &session).await {
            return Err(Self::abort(tx, "register", e).await);
        }
        tx.commit()
            .await
            .map_err(|e| identity_write_error("register", &identity, e))?;

        tracing::info!(
            identity_id = %identity.id,
            nickname = %identity.nickname,
            "Identity registered"
        );

        Ok(AuthenticatedSession { identity, session })
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AccountError> {
        if email.is_empty() {
            return Err(EmailError::Empty.into());
        }
        let password = Password::new(password)?;

        let identity = self
            .store
            .find_identity_by_email(email)
            .await
            .map_err(|e| AccountError::persistence("login", e))?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self
            .password_hasher
            .verify(&identity.password_hash, password.expose())
        {
            tracing::debug!(identity_id = %identity.id, "Login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        let session = self.new_session(&identity.id, Utc::now())?;
        self.store
            .create_session(&session)
            .await
            .map_err(|e| AccountError::persistence("login", e))?;

        tracing::info!(identity_id = %identity.id, session_id = %session.id, "Session issued");

        Ok(AuthenticatedSession { identity, session })
    }

    async fn resolve_session(&self, token_value: &str) -> Result<Identity, AccountError> {
        if token_value.is_empty() {
            return Err(AccountError::UnknownSession);
        }

        let session = self
            .store
            .find_session_by_value(token_value)
            .await
            .map_err(|e| AccountError::persistence("resolve_session", e))?
            .ok_or(AccountError::UnknownSession)?;

        self.store
            .find_identity_by_id(&session.identity_id)
            .await
            .map_err(|e| AccountError::persistence("resolve_session", e))?
            .ok_or_else(|| {
                tracing::error!(
                    session_id = %session.id,
                    identity_id = %session.identity_id,
                    "Session references a missing identity"
                );
                AccountError::DanglingSession(session.id.to_string())
            })
    }

    async fn authorize_nickname(
        &self,
        token_value: &str,
        nickname: &str,
    ) -> Result<Identity, AccountError> {
        let identity = self.resolve_session(token_value).await?;
        if identity.nickname.as_str() != nickname {
            return Err(AccountError::NotOwner);
        }
        Ok(identity)
    }

    async fn change_password(
        &self,
        identity: &Identity,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if !self
            .password_hasher
            .verify(&identity.password_hash, old_password)
        {
            return Err(AccountError::IncorrectPassword);
        }
        let new_password = Password::new(new_password)?;

        let password_hash = self.password_hasher.hash(new_password.expose())?;

        self.store
            .set_password_hash(&identity.id, &password_hash, Utc::now())
            .await
            .map_err(|e| identity_write_error("change_password", identity, e))?;

        tracing::info!(identity_id = %identity.id, "Password changed");

        Ok(())
    }

    async fn issue_reset_ticket(
        &self,
        identity_id: &IdentityId,
    ) -> Result<ResetTicket, AccountError> {
        self.find_identity(identity_id, "issue_reset_ticket").await?;

        let ticket = ResetTicket {
            id: ResetTicketId(self.id_generator.generate()?),
            secret: self.id_generator.generate_secret()?,
            identity_id: identity_id.clone(),
            created_at: Utc::now(),
            used: false,
        };

        self.store
            .create_reset_ticket(&ticket)
            .await
            .map_err(|e| AccountError::persistence("issue_reset_ticket", e))?;

        tracing::info!(identity_id = %identity_id, ticket_id = %ticket.id, "Reset ticket issued");

        Ok(ticket)
    }

    async fn consume_reset_ticket(
        &self,
        secret: &str,
        new_password: &str,
    ) -> Result<Identity, AccountError> {
        let new_password = Password::new(new_password)?;
        if secret.is_empty() {
            return Err(AccountError::UnknownResetTicket);
        }

        let ticket = self
            .store
            .find_reset_ticket_by_secret(secret)
            .await
            .map_err(|e| AccountError::persistence("consume_reset_ticket", e))?
            .ok_or(AccountError::UnknownResetTicket)?;
        if ticket.used {
            return Err(AccountError::ResetTicketUsed);
        }

        let password_hash = self.password_hasher.hash(new_password.expose())?;
        let now = Utc::now();

        // Only the ticket flag and the password hash are written, so profile
        // and billing changes made meanwhile survive.
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| AccountError::persistence("consume_reset_ticket", e))?;
        if let Err(e) = Self::write_reset(&mut tx, &ticket, &password_hash, now).await {
            return Err(Self::abort(tx, "consume_reset_ticket", e).await);
        }
        tx.commit()
            .await
            .map_err(|e| AccountError::persistence("consume_reset_ticket", e))?;

        tracing::info!(
            identity_id = %ticket.identity_id,
            ticket_id = %ticket.id,
            "Reset ticket consumed"
        );

        self.find_identity(&ticket.identity_id, "consume_reset_ticket")
            .await
    }

    async fn get_identity_by_nickname(&self, nickname: &str) -> Result<Identity, AccountError> {
        self.store
            .find_identity_by_nickname(nickname)
            .await
            .map_err(|e| AccountError::persistence("get_identity_by_nickname", e))?
            .ok_or_else(|| AccountError::NotFound(nickname.to_string()))
    }

    async fn update_profile(
        &self,
        identity: Identity,
        command: UpdateProfileCommand,
    ) -> Result<Identity, AccountError> {
        let mut identity = identity;

        if let Some(email) = command.email {
            identity.email = email;
        }
        if let Some(display_name) = command.display_name {
            identity.display_name = Some(display_name);
        }
        if let Some(avatar_link) = command.avatar_link {
            identity.avatar_link = Some(avatar_link);
        }
        identity.updated_at = Utc::now();

        self.store
            .update_identity(&identity)
            .await
            .map_err(|e| identity_write_error("update_profile", &identity, e))?;

        tracing::info!(identity_id = %identity.id, "Profile updated");

        self.find_identity(&identity.id, "update_profile").await
    }
}
