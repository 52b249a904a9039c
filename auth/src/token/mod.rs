pub mod errors;
pub mod generator;

pub use errors::TokenError;
pub use generator::generate_secret;
pub use generator::ShortIdGenerator;
pub use generator::SECRET_LENGTH;
