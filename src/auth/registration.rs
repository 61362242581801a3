//! Account registration and credential checks.

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::validation::{normalize_email, validate_email, ValidationError};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::{NewUser, User, UserRepository};
use crate::VaultError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("email already registered")]
    EmailExists,

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(VaultError),
}

impl From<RegistrationError> for VaultError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => VaultError::Validation(e.to_string()),
            RegistrationError::EmailExists => {
                VaultError::Conflict("email already registered".to_string())
            }
            RegistrationError::Password(e @ (PasswordError::TooShort | PasswordError::TooLong)) => {
                VaultError::Validation(e.to_string())
            }
            RegistrationError::Password(e) => VaultError::StorageFailure(e.to_string()),
            RegistrationError::Store(e) => e,
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    /// Password (8-128 characters).
    pub password: String,
}

impl RegistrationRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Register a new account.
///
/// The email is normalized to lowercase, validated, and checked for
/// uniqueness before the password is hashed. A concurrent registration that
/// slips past the check is still rejected by the unique index.
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    let email = normalize_email(&request.email);
    validate_email(&email)?;

    if repo
        .email_exists(&email)
        .await
        .map_err(RegistrationError::Store)?
    {
        return Err(RegistrationError::EmailExists);
    }

    let password_hash = hash_password(&request.password)?;

    let user = repo
        .create(&NewUser::new(&email, password_hash))
        .await
        .map_err(|e| match e {
            VaultError::Conflict(_) => RegistrationError::EmailExists,
            other => RegistrationError::Store(other),
        })?;

    info!(user_id = user.id, email = %user.email, "New user registered");

    Ok(user)
}

/// Check an email/password pair.
///
/// Unknown email and wrong password produce the same `Unauthorized` error.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    email: &str,
    password: &str,
) -> crate::Result<User> {
    let invalid = || VaultError::Unauthorized("invalid email or password".to_string());

    let Some(user) = repo.get_by_email(&normalize_email(email)).await? else {
        debug!("Login attempt for unknown email");
        return Err(invalid());
    };

    verify_password(password, &user.password_hash).map_err(|e| {
        debug!(user_id = user.id, error = %e, "Password check failed");
        invalid()
    })?;

    Ok(user)
}
