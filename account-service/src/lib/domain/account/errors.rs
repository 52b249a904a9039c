use std::fmt;

use thiserror::Error;

/// Error for Nickname validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NicknameError {
    #[error("Nickname can't be empty")]
    Empty,

    #[error("Allowed nickname characters: lowercase letters, numbers and dash")]
    InvalidCharacters,
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Email can not be empty")]
    Empty,

    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for caller-supplied password validation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password can not be empty")]
    Empty,
}

/// Error raised by the password hasher port
#[derive(Debug, Clone, Error)]
#[error("Password hashing failed: {0}")]
pub struct HashingError(pub String);

/// Error raised by the id generator port
#[derive(Debug, Clone, Error)]
#[error("Identifier generation failed: {0}")]
pub struct IdGenerationError(pub String);

/// Unique keys a store can report a violation on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    IdentityId,
    Email,
    Nickname,
    SessionValue,
    TicketSecret,
    Other,
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueKey::IdentityId => "identity id",
            UniqueKey::Email => "email",
            UniqueKey::Nickname => "nickname",
            UniqueKey::SessionValue => "session token value",
            UniqueKey::TicketSecret => "reset ticket secret",
            UniqueKey::Other => "unknown key",
        };
        f.write_str(name)
    }
}

/// Error for storage port operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unique constraint violated on {0}")]
    Conflict(UniqueKey),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Stored record is malformed: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<NicknameError> for StoreError {
    fn from(err: NicknameError) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

impl From<EmailError> for StoreError {
    fn from(err: EmailError) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// Stable classification of account errors for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    Unauthorized,
    Forbidden,
    NotFound,
    Persistence,
    Internal,
}

/// Top-level error for all account operations
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid nickname: {0}")]
    InvalidNickname(#[from] NicknameError),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordError),

    // Uniqueness and state conflicts
    #[error("This email is already registered. Try to log in.")]
    EmailAlreadyRegistered,

    #[error("Nickname already taken: {0}")]
    NicknameTaken(String),

    #[error("Reset ticket has already been used")]
    ResetTicketUsed,

    // Credential failures
    #[error("Could not log in")]
    InvalidCredentials,

    #[error("Old password is incorrect")]
    IncorrectPassword,

    #[error("Token is associated to no identity")]
    UnknownSession,

    #[error("Reset ticket is not valid")]
    UnknownResetTicket,

    #[error("No right to access")]
    NotOwner,

    #[error("Identity not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Persistence failure during {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Hashing(#[from] HashingError),

    #[error("{0}")]
    IdGeneration(#[from] IdGenerationError),

    #[error("Session {0} references a missing identity")]
    DanglingSession(String),
}

impl AccountError {
    /// Wrap a storage failure with the name of the operation it happened in.
    pub fn persistence(operation: &'static str, source: StoreError) -> Self {
        AccountError::Persistence { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::InvalidEmail(_)
            | AccountError::InvalidNickname(_)
            | AccountError::InvalidPassword(_) => ErrorKind::InvalidInput,
            AccountError::EmailAlreadyRegistered
            | AccountError::NicknameTaken(_)
            | AccountError::ResetTicketUsed => ErrorKind::Conflict,
            AccountError::InvalidCredentials
            | AccountError::IncorrectPassword
            | AccountError::UnknownSession
            | AccountError::UnknownResetTicket => ErrorKind::Unauthorized,
            AccountError::NotOwner => ErrorKind::Forbidden,
            AccountError::NotFound(_) => ErrorKind::NotFound,
            AccountError::Persistence { .. } => ErrorKind::Persistence,
            AccountError::Hashing(_)
            | AccountError::IdGeneration(_)
            | AccountError::DanglingSession(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_invalid_input() {
        let err: AccountError = NicknameError::InvalidCharacters.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err: AccountError = EmailError::Empty.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Invalid email: Email can not be empty");
    }

    #[test]
    fn test_persistence_error_names_operation() {
        let err = AccountError::persistence("register", StoreError::Database("timeout".into()));

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(
            err.to_string(),
            "Persistence failure during register: Database error: timeout"
        );
    }

    #[test]
    fn test_credential_errors_do_not_leak_details() {
        assert_eq!(AccountError::InvalidCredentials.to_string(), "Could not log in");
        assert_eq!(
            AccountError::InvalidCredentials.kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(AccountError::NotOwner.kind(), ErrorKind::Forbidden);
    }
}
