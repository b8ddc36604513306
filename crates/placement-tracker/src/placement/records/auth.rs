//! Student accounts, the configured administrator, and bearer sessions.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::repository::RepositoryError;
use crate::config::AdminCredentials;

const MIN_PASSWORD_LEN: usize = 8;

/// Authenticated caller, resolved per request from its bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Principal {
    Admin { email: String },
    Student { email: String, student_number: String },
}

impl Principal {
    pub fn email(&self) -> &str {
        match self {
            Self::Admin { email } | Self::Student { email, .. } => email,
        }
    }

    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentAccount {
    pub email: String,
    pub name: String,
    pub student_number: String,
    /// Argon2id PHC string; carries its own salt and parameters.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub student_number: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub principal: Principal,
}

pub trait AccountRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    fn insert(&self, account: StudentAccount) -> Result<StudentAccount, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<StudentAccount>, RepositoryError>;
}

pub trait SessionStore: Send + Sync {
    fn issue(&self, token: String, principal: Principal) -> Result<(), RepositoryError>;
    fn resolve(&self, token: &str) -> Result<Option<Principal>, RepositoryError>;
    /// Returns whether a session was removed.
    fn revoke(&self, token: &str) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("an account with email '{0}' already exists")]
    DuplicateEmail(String),
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

/// Configured administrator, with the password kept only as a hash.
struct AdminAccount {
    email: String,
    password_hash: String,
}

pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    sessions: Arc<dyn SessionStore>,
    admin: Option<AdminAccount>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        sessions: Arc<dyn SessionStore>,
        admin: Option<AdminCredentials>,
    ) -> Result<Self, AuthError> {
        let admin = match admin {
            Some(credentials) => Some(AdminAccount {
                email: normalize_email(&credentials.email),
                password_hash: hash_password(&credentials.password)?,
            }),
            None => None,
        };

        Ok(Self {
            accounts,
            sessions,
            admin,
        })
    }

    pub fn register_student(&self, registration: Registration) -> Result<Session, AuthError> {
        let email = normalize_email(&registration.email);
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        let name = registration.name.trim().to_string();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        let student_number = registration.student_number.trim().to_string();
        if student_number.is_empty() {
            return Err(AuthError::MissingField("student_number"));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let account = StudentAccount {
            password_hash: hash_password(&registration.password)?,
            email: email.clone(),
            name,
            student_number,
            created_at: Utc::now(),
        };

        let account = match self.accounts.insert(account) {
            Ok(account) => account,
            Err(RepositoryError::Conflict(_)) => {
                warn!(%email, "registration rejected: email already registered");
                return Err(AuthError::DuplicateEmail(email));
            }
            Err(other) => return Err(other.into()),
        };

        info!(email = %account.email, "student registered");
        self.open_session(Principal::Student {
            email: account.email,
            student_number: account.student_number,
        })
    }

    pub fn login_student(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let email = normalize_email(&credentials.email);
        let account = self.accounts.find_by_email(&email)?;

        match account {
            Some(account) if verify_password(&account.password_hash, &credentials.password) => {
                self.open_session(Principal::Student {
                    email: account.email,
                    student_number: account.student_number,
                })
            }
            _ => {
                warn!(%email, "student login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Fails unless administrator credentials are configured and match.
    pub fn login_admin(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let email = normalize_email(&credentials.email);
        let matches = self.admin.as_ref().is_some_and(|admin| {
            admin.email == email && verify_password(&admin.password_hash, &credentials.password)
        });

        if !matches {
            warn!(%email, "admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(Principal::Admin { email })
    }

    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        self.sessions
            .resolve(token)?
            .ok_or(AuthError::Unauthenticated)
    }

    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.sessions.revoke(token)? {
            Ok(())
        } else {
            Err(AuthError::Unauthenticated)
        }
    }

    fn open_session(&self, principal: Principal) -> Result<Session, AuthError> {
        let token = Uuid::new_v4().to_string();
        self.sessions.issue(token.clone(), principal.clone())?;
        info!(email = principal.email(), admin = principal.is_admin(), "session opened");
        Ok(Session { token, principal })
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(hashing_error)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(hashing_error)?;
    Ok(hash.to_string())
}

/// Constant-time check against a stored PHC string; malformed hashes never match.
fn verify_password(stored: &str, password: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|hash| Argon2::default().verify_password(password.as_bytes(), &hash))
        .is_ok()
}

fn hashing_error(err: argon2::password_hash::Error) -> AuthError {
    AuthError::Hashing(err.to_string())
}
