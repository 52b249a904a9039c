use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::errors::HashingError;
use crate::account::errors::IdGenerationError;
use crate::account::errors::StoreError;
use crate::account::models::AuthenticatedSession;
use crate::account::models::Identity;
use crate::account::models::IdentityId;
use crate::account::models::ResetTicket;
use crate::account::models::ResetTicketId;
use crate::account::models::SessionToken;
use crate::account::models::UpdateProfileCommand;

/// Port for account domain service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new identity and open its first session.
    ///
    /// # Arguments
    /// * `email` - Raw email address
    /// * `nickname` - Raw nickname, `[0-9a-z-]+`
    /// * `password` - Plaintext password (hashed by the service)
    ///
    /// # Returns
    /// The created identity with its first session token
    ///
    /// # Errors
    /// * `InvalidEmail` / `InvalidPassword` / `InvalidNickname` - Validation failed, in that order
    /// * `EmailAlreadyRegistered` / `NicknameTaken` - Uniqueness violated
    /// * `Hashing` / `IdGeneration` - Credential material could not be produced
    /// * `Persistence` - Transaction failed and was rolled back
    async fn register(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AccountError>;

    /// Verify credentials and open a new session.
    ///
    /// # Errors
    /// * `InvalidEmail` / `InvalidPassword` - Empty input
    /// * `InvalidCredentials` - Unknown email or wrong password, indistinguishably
    /// * `Persistence` - Storage failure
    async fn login(&self, email: &str, password: &str)
        -> Result<AuthenticatedSession, AccountError>;

    /// Resolve a session token value to the identity owning it.
    ///
    /// # Errors
    /// * `UnknownSession` - No session with this value
    /// * `DanglingSession` - Session references a missing identity
    /// * `Persistence` - Storage failure
    async fn resolve_session(&self, token_value: &str) -> Result<Identity, AccountError>;

    /// Resolve a session and require it to belong to `nickname`.
    ///
    /// # Errors
    /// * `NotOwner` - Session belongs to another identity
    /// * Any error of `resolve_session`
    async fn authorize_nickname(
        &self,
        token_value: &str,
        nickname: &str,
    ) -> Result<Identity, AccountError>;

    /// Replace the password of an identity after checking the current one.
    ///
    /// Outstanding sessions stay valid.
    ///
    /// # Errors
    /// * `IncorrectPassword` - Old password does not match
    /// * `InvalidPassword` - New password is empty
    /// * `Hashing` - New password could not be hashed
    /// * `Persistence` - Storage failure
    async fn change_password(
        &self,
        identity: &Identity,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError>;

    /// Issue a one-time password reset ticket for an identity.
    ///
    /// # Errors
    /// * `NotFound` - Identity does not exist
    /// * `IdGeneration` - Ticket id or secret could not be produced
    /// * `Persistence` - Storage failure
    async fn issue_reset_ticket(&self, identity_id: &IdentityId)
        -> Result<ResetTicket, AccountError>;

    /// Burn a reset ticket and set a new password, atomically.
    ///
    /// # Errors
    /// * `InvalidPassword` - New password is empty
    /// * `UnknownResetTicket` - No ticket with this secret
    /// * `ResetTicketUsed` - Ticket was already consumed
    /// * `Hashing` - New password could not be hashed
    /// * `Persistence` - Transaction failed and was rolled back
    async fn consume_reset_ticket(
        &self,
        secret: &str,
        new_password: &str,
    ) -> Result<Identity, AccountError>;

    /// Retrieve an identity by nickname.
    ///
    /// # Errors
    /// * `NotFound` - No identity with this nickname
    /// * `Persistence` - Storage failure
    async fn get_identity_by_nickname(&self, nickname: &str) -> Result<Identity, AccountError>;

    /// Update mutable profile fields.
    ///
    /// # Errors
    /// * `EmailAlreadyRegistered` - New email belongs to another identity
    /// * `Persistence` - Storage failure
    async fn update_profile(
        &self,
        identity: Identity,
        command: UpdateProfileCommand,
    ) -> Result<Identity, AccountError>;
}

/// Persistence operations for identities.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// # Errors
    /// * `Conflict` - Id, email or nickname already taken
    /// * `Database` - Database operation failed
    async fn create_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    async fn find_identity_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, StoreError>;

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_identity_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<Identity>, StoreError>;

    /// Write the owner-editable profile fields (email, display name, avatar
    /// link) and `updated_at`, keyed by id.
    ///
    /// Password hash, nickname and `premium` keep their stored values.
    ///
    /// # Errors
    /// * `NotFound` - Identity does not exist
    /// * `Conflict` - New email is already registered
    /// * `Database` - Database operation failed
    async fn update_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Replace only the password hash and `updated_at`.
    ///
    /// # Errors
    /// * `NotFound` - Identity does not exist
    /// * `Database` - Database operation failed
    async fn set_password_hash(
        &self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Persistence operations for session tokens.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn create_session(&self, session: &SessionToken) -> Result<(), StoreError>;

    async fn find_session_by_value(&self, value: &str)
        -> Result<Option<SessionToken>, StoreError>;
}

/// Persistence operations for reset tickets.
#[async_trait]
pub trait ResetTicketStore: Send + Sync + 'static {
    async fn create_reset_ticket(&self, ticket: &ResetTicket) -> Result<(), StoreError>;

    async fn find_reset_ticket_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<ResetTicket>, StoreError>;
}

/// Writes that take part in a caller-managed transaction.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn create_identity(&mut self, identity: &Identity) -> Result<(), StoreError>;

    async fn set_password_hash(
        &mut self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn create_session(&mut self, session: &SessionToken) -> Result<(), StoreError>;

    /// Flip `used` from false to true.
    ///
    /// # Returns
    /// `true` if this call consumed the ticket, `false` if it was already used
    ///
    /// # Errors
    /// * `NotFound` - Ticket does not exist
    async fn mark_reset_ticket_used(&mut self, id: &ResetTicketId) -> Result<bool, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Storage collaborator of the account service.
#[async_trait]
pub trait AccountStore: IdentityStore + SessionStore + ResetTicketStore {
    type Transaction: StoreTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// One-way adaptive password hashing.
pub trait PasswordHasher: Send + Sync + 'static {
    fn hash(&self, plaintext: &str) -> Result<String, HashingError>;

    /// Returns false for a mismatch and for an unreadable hash alike.
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}

/// Source of identifiers and unguessable secrets.
pub trait IdGenerator: Send + Sync + 'static {
    /// Short, URL-safe unique identifier for new records.
    fn generate(&self) -> Result<String, IdGenerationError>;

    /// Unguessable value for session tokens and reset tickets.
    fn generate_secret(&self) -> Result<String, IdGenerationError>;
}
