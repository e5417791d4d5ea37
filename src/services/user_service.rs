use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{TokenError, TokenService};
use crate::database::models::User;
use crate::database::store::{StoreError, UserStore};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("user not found")]
    NotFound,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(errors) => ApiError::validation(errors),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::Hash(msg) => {
                tracing::error!("password hashing error: {}", msg);
                ApiError::internal_server_error(msg)
            }
            UserServiceError::Store(e) => e.into(),
            UserServiceError::Token(e) => e.into(),
        }
    }
}

/// Registration, login, and identity lookup.
pub struct UserService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// Create an identity and issue its first token. All field validation
    /// runs before any write.
    pub async fn register(&self, payload: RegisterPayload) -> Result<String, UserServiceError> {
        let name = payload.name.unwrap_or_default().trim().to_string();
        let email = payload.email.unwrap_or_default().trim().to_lowercase();
        let password = payload.password.unwrap_or_default();

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push("Name is required".to_string());
        }
        if !is_valid_email(&email) {
            errors.push("Please include a valid email".to_string());
        }
        if password.chars().count() < 6 {
            errors.push("Please choose a password with at least 6 characters".to_string());
        }
        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(UserServiceError::Validation(vec![
                "User already exists".to_string(),
            ]));
        }

        let user = User::new(name, email, hash_password(&password)?);
        let user_id = user.id;
        match self.users.insert(user).await {
            // Lost the race against a concurrent registration for the same
            // email; same answer as the pre-check.
            Err(StoreError::DuplicateEmail) => {
                return Err(UserServiceError::Validation(vec![
                    "User already exists".to_string(),
                ]))
            }
            other => other?,
        }

        Ok(self.tokens.issue(user_id)?)
    }

    /// Verify credentials and issue a token. Unknown email and wrong
    /// password are indistinguishable to the caller.
    pub async fn login(&self, payload: LoginPayload) -> Result<String, UserServiceError> {
        let email = payload.email.unwrap_or_default().trim().to_lowercase();
        let password = payload.password.unwrap_or_default();

        let mut errors = Vec::new();
        if !is_valid_email(&email) {
            errors.push("Please include a valid email".to_string());
        }
        if password.chars().count() < 6 {
            errors.push("Please choose a password with at least 6 characters".to_string());
        }
        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|user| verify_password(&password, &user.password))
            .ok_or_else(|| {
                UserServiceError::Validation(vec!["Invalid credentials".to_string()])
            })?;

        Ok(self.tokens.issue(user.id)?)
    }

    /// Look up the authenticated identity. Fails with NotFound when the
    /// account has been deleted, even though the presented token is still
    /// cryptographically valid until its natural expiry.
    pub async fn current_user(&self, id: Uuid) -> Result<User, UserServiceError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn hash_password(password: &str) -> Result<String, UserServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserServiceError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::database::memory::MemoryStore;

    fn service() -> UserService {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new(&SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            token_expiry_days: 5,
        });
        UserService::new(store, tokens)
    }

    fn register_payload(email: &str) -> RegisterPayload {
        RegisterPayload {
            name: Some("Ada".to_string()),
            email: Some(email.to_string()),
            password: Some("hunter22".to_string()),
        }
    }

    #[tokio::test]
    async fn register_collects_every_validation_failure() {
        let err = service()
            .register(RegisterPayload {
                name: None,
                email: Some("nope".to_string()),
                password: Some("abc".to_string()),
            })
            .await
            .unwrap_err();
        match err {
            UserServiceError::Validation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service();
        service.register(register_payload("ada@example.com")).await.unwrap();
        let err = service
            .register(register_payload("ada@example.com"))
            .await
            .unwrap_err();
        match err {
            UserServiceError::Validation(errors) => {
                assert_eq!(errors, vec!["User already exists".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let service = service();
        service.register(register_payload("ada@example.com")).await.unwrap();
        let err = service
            .login(LoginPayload {
                email: Some("ada@example.com".to_string()),
                password: Some("wrong-password".to_string()),
            })
            .await
            .unwrap_err();
        match err {
            UserServiceError::Validation(errors) => {
                assert_eq!(errors, vec!["Invalid credentials".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn email_validation_basics() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("plain"));
        assert!(!is_valid_email("@b.co"));
    }
}
