//! Credential primitives library
//!
//! Provides reusable credential infrastructure for services that own accounts:
//! - Password hashing (Argon2id with a fixed, configurable work factor)
//! - Short alphanumeric identifier generation
//! - Unguessable secret generation for bearer tokens and one-time tickets
//!
//! Each service defines its own hashing and id generation traits and adapts
//! these implementations, so no domain logic leaks across service boundaries.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Identifiers and Secrets
//! ```
//! use auth::ShortIdGenerator;
//!
//! let ids = ShortIdGenerator::default();
//! let id = ids.generate();
//! assert_eq!(id.len(), 12);
//!
//! let secret = auth::generate_secret().unwrap();
//! assert_eq!(secret.len(), auth::SECRET_LENGTH);
//! ```

pub mod password;
pub mod token;

// Re-export commonly used items
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::generate_secret;
pub use token::ShortIdGenerator;
pub use token::TokenError;
pub use token::SECRET_LENGTH;
