use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::EmailError;
use crate::account::errors::NicknameError;
use crate::account::errors::PasswordError;

/// Identity aggregate entity.
///
/// Represents a registered account. The password hash stays inside the
/// domain: it is redacted from `Debug` and never rendered by adapters.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub password_hash: String,
    pub nickname: Nickname,
    pub email: EmailAddress,
    pub display_name: Option<String>,
    pub avatar_link: Option<String>,
    pub premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("password_hash", &"<redacted>")
            .field("nickname", &self.nickname)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("avatar_link", &self.avatar_link)
            .field("premium", &self.premium)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Identity unique identifier type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Nickname value type
///
/// Non-empty and restricted to lowercase ASCII letters, digits and dash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    /// Create a new valid nickname.
    ///
    /// # Arguments
    /// * `nickname` - Raw nickname string
    ///
    /// # Errors
    /// * `Empty` - Nickname is empty
    /// * `InvalidCharacters` - Contains anything outside `[0-9a-z-]`
    pub fn new(nickname: String) -> Result<Self, NicknameError> {
        if nickname.is_empty() {
            return Err(NicknameError::Empty);
        }

        if nickname
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            Ok(Self(nickname))
        } else {
            Err(NicknameError::InvalidCharacters)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `Empty` - Email is empty
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        if email.is_empty() {
            return Err(EmailError::Empty);
        }

        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password supplied by a caller.
///
/// Only guarantees non-emptiness; never printed.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// # Errors
    /// * `Empty` - Password is empty
    pub fn new(password: &str) -> Result<Self, PasswordError> {
        if password.is_empty() {
            Err(PasswordError::Empty)
        } else {
            Ok(Self(password.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Session token identifier type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTokenId(pub String);

impl fmt::Display for SessionTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque bearer credential for an authenticated session.
///
/// `value` is the only lookup key used for authorization. Tokens are never
/// deleted, only superseded by newer ones.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub id: SessionTokenId,
    pub value: String,
    pub identity_id: IdentityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("id", &self.id)
            .field("value", &"<redacted>")
            .field("identity_id", &self.identity_id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Reset ticket identifier type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResetTicketId(pub String);

impl fmt::Display for ResetTicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One-time password reset grant.
///
/// The secret is handed to the caller for out-of-band delivery. A ticket is
/// consumed at most once.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub id: ResetTicketId,
    pub secret: String,
    pub identity_id: IdentityId,
    pub created_at: DateTime<Utc>,
    pub used: bool,
}

impl fmt::Debug for ResetTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetTicket")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("identity_id", &self.identity_id)
            .field("created_at", &self.created_at)
            .field("used", &self.used)
            .finish()
    }
}

/// Result of a successful registration or login.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub identity: Identity,
    pub session: SessionToken,
}

/// Command to update the mutable profile fields of an identity.
///
/// All fields are optional to support partial updates.
/// Only provided fields will be updated.
#[derive(Debug, Default)]
pub struct UpdateProfileCommand {
    pub email: Option<EmailAddress>,
    pub display_name: Option<String>,
    pub avatar_link: Option<String>,
}
