use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::warn;

use crate::{
    auth::{
        password::{hash_password, verify_against_dummy, verify_password},
        repo_types::User,
    },
    error::ApiError,
};

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<RegisterError> for ApiError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Storage(e) => ApiError::Internal(e),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates a user after normalizing input and checking both unique columns.
/// The username check runs first, so a taken username is reported even when
/// the email is also taken.
pub async fn register(
    db: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, RegisterError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if username.is_empty() {
        return Err(RegisterError::Invalid("Username is required"));
    }
    if email.is_empty() {
        return Err(RegisterError::Invalid("Email is required"));
    }
    if password.is_empty() {
        return Err(RegisterError::Invalid("Password is required"));
    }
    if !is_valid_email(&email) {
        return Err(RegisterError::Invalid("Invalid email"));
    }

    if User::find_by_username(db, username).await?.is_some() {
        warn!(username, "username already registered");
        return Err(RegisterError::DuplicateUsername);
    }
    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(RegisterError::DuplicateEmail);
    }

    let hash = hash_password(password)?;

    // A concurrent registration can still win the race between the checks
    // above and this insert; the UNIQUE constraints settle it.
    User::create(db, username, &email, &hash)
        .await
        .map_err(|e| {
            let message = e.as_database_error().map(|d| d.message().to_string());
            match message.as_deref() {
                Some(m) if m.contains("users.username") => RegisterError::DuplicateUsername,
                Some(m) if m.contains("users.email") => RegisterError::DuplicateEmail,
                _ => RegisterError::Storage(anyhow::Error::new(e).context("insert user")),
            }
        })
}

/// Returns the user only when the password matches. Unknown usernames and
/// wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let Some(user) = User::find_by_username(db, username.trim()).await? else {
        verify_against_dummy(password);
        return Ok(None);
    };
    if verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
