//! Authentication for filevault.
//!
//! Argon2id password hashing, email/password registration and login, and
//! HS256 access tokens.

mod password;
mod registration;
pub mod token;
pub mod validation;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use registration::{authenticate, register, RegistrationError, RegistrationRequest};
pub use token::{Claims, TokenIssuer, DEFAULT_TOKEN_EXPIRY_SECS};
pub use validation::ValidationError;
