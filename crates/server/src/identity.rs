//! Identity service: registration, login and bearer tokens.
//!
//! The game engine never consults this module; any session may join under any
//! name. It exists so the HTTP front end can offer accounts alongside the game.
//!
//! Users live in process memory only and are lost on restart.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IdentityConfig;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A user record as exposed to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful register or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: SafeUser,
    pub token: String,
}

/// Registration input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Identity errors.
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("username, email and password are required")]
    MissingFields,
    #[error("username must be at least {0} characters")]
    UsernameTooShort(usize),
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("User with this email or username already exists")]
    AlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Invalid token")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// HTTP status code conventionally associated with the error.
    pub fn status_code(&self) -> u16 {
        match self {
            IdentityError::MissingFields
            | IdentityError::UsernameTooShort(_)
            | IdentityError::PasswordTooShort(_) => 400,
            IdentityError::InvalidCredentials
            | IdentityError::NotAuthenticated
            | IdentityError::InvalidToken => 401,
            IdentityError::UserNotFound => 404,
            IdentityError::AlreadyExists => 409,
            IdentityError::Internal(_) => 500,
        }
    }
}

/// The identity boundary consumed by front ends.
pub trait IdentityProvider: Send + Sync {
    fn register(&self, request: RegisterRequest) -> Result<AuthSession, IdentityError>;
    fn login(&self, request: LoginRequest) -> Result<AuthSession, IdentityError>;
    /// Resolve a bearer token to its user. `None` means no token was presented.
    fn whoami(&self, token: Option<&str>) -> Result<SafeUser, IdentityError>;
    /// Invalidate a token.
    fn logout(&self, token: Option<&str>) -> Result<(), IdentityError>;
}

/// JWT claims carried by issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    /// User id.
    sub: String,
    iat: u64,
    exp: u64,
    /// Unique token id, used for revocation.
    jti: String,
}

#[derive(Debug, Clone)]
struct StoredUser {
    public: SafeUser,
    password_hash: String,
}

/// In-memory identity store issuing HS256 tokens.
pub struct MemoryIdentity {
    config: IdentityConfig,
    users: RwLock<Vec<StoredUser>>,
    /// Revoked token ids with their expiry; entries past expiry are pruned.
    revoked: RwLock<HashMap<String, u64>>,
}

impl MemoryIdentity {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            config,
            users: RwLock::new(Vec::new()),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn issue_token(&self, user: &SafeUser) -> Result<String, IdentityError> {
        let now = unix_now();
        let claims = TokenClaims {
            sub: user.id.to_string(),
            iat: now,
            exp: now + self.config.token_ttl_secs,
            jti: Uuid::new_v4().to_string(),
        };
        let key = EncodingKey::from_secret(self.config.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| IdentityError::Internal(e.to_string()))
    }

    fn verify_token(&self, token: &str) -> Result<TokenClaims, IdentityError> {
        let key = DecodingKey::from_secret(self.config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = TOKEN_LEEWAY_SECS;
        let data = decode::<TokenClaims>(token, &key, &validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            IdentityError::InvalidToken
        })?;

        let revoked = self.revoked.read().unwrap_or_else(PoisonError::into_inner);
        if revoked.contains_key(&data.claims.jti) {
            return Err(IdentityError::InvalidToken);
        }
        Ok(data.claims)
    }

    fn session_for(&self, user: SafeUser) -> Result<AuthSession, IdentityError> {
        let token = self.issue_token(&user)?;
        Ok(AuthSession { user, token })
    }
}

/// Clock skew tolerated when checking `exp`.
const TOKEN_LEEWAY_SECS: u64 = 60;

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Internal(format!("hash error: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

impl IdentityProvider for MemoryIdentity {
    fn register(&self, request: RegisterRequest) -> Result<AuthSession, IdentityError> {
        if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
            return Err(IdentityError::MissingFields);
        }

        let username = request.username.trim().to_string();
        if username.chars().count() < self.config.min_username_length {
            return Err(IdentityError::UsernameTooShort(self.config.min_username_length));
        }
        if request.password.chars().count() < self.config.min_password_length {
            return Err(IdentityError::PasswordTooShort(self.config.min_password_length));
        }
        let email = request.email.trim().to_lowercase();

        // Hash outside the lock.
        let password_hash = hash_password(&request.password)?;

        let user = {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            if users
                .iter()
                .any(|u| u.public.email == email || u.public.username == username)
            {
                return Err(IdentityError::AlreadyExists);
            }

            let user = SafeUser {
                id: Uuid::new_v4(),
                username,
                email,
                role: Role::User,
                created_at: Utc::now(),
            };
            users.push(StoredUser {
                public: user.clone(),
                password_hash,
            });
            user
        };

        info!("Registered user '{}' ({})", user.username, user.id);
        self.session_for(user)
    }

    fn login(&self, request: LoginRequest) -> Result<AuthSession, IdentityError> {
        if request.email.is_empty() || request.password.is_empty() {
            return Err(IdentityError::MissingFields);
        }
        let email = request.email.trim().to_lowercase();

        let stored = {
            let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
            users.iter().find(|u| u.public.email == email).cloned()
        };
        let stored = stored.ok_or(IdentityError::InvalidCredentials)?;
        if !verify_password(&request.password, &stored.password_hash) {
            return Err(IdentityError::InvalidCredentials);
        }

        info!("User '{}' logged in", stored.public.username);
        self.session_for(stored.public)
    }

    fn whoami(&self, token: Option<&str>) -> Result<SafeUser, IdentityError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(IdentityError::NotAuthenticated)?;
        let claims = self.verify_token(token)?;
        let id: Uuid = claims.sub.parse().map_err(|_| IdentityError::InvalidToken)?;

        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users
            .iter()
            .find(|u| u.public.id == id)
            .map(|u| u.public.clone())
            .ok_or(IdentityError::UserNotFound)
    }

    fn logout(&self, token: Option<&str>) -> Result<(), IdentityError> {
        // Logging out without a valid token is not an error; there is nothing to clear.
        if let Some(claims) = token.and_then(|t| self.verify_token(t).ok()) {
            let now = unix_now();
            let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);
            // Once past expiry plus leeway a token fails validation on its own.
            revoked.retain(|_, exp| *exp + TOKEN_LEEWAY_SECS > now);
            revoked.insert(claims.jti, claims.exp);
            debug!("Revoked token for user {} ({} revocations held)", claims.sub, revoked.len());
        }
        Ok(())
    }
}
