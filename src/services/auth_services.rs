// src/services/auth_services.rs - signup, login and session tokens
use std::sync::{Arc, LazyLock};

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use regex::Regex;
use validator::Validate;

use crate::dtos::auth::{LoginIn, SessionOut, SignupIn};
use crate::dtos::form_errors::{FormErrors, NON_FIELD_ERRORS, REQUIRED_MESSAGE};
use crate::error::{AppError, AppResult};
use crate::models::user::{JwtClaims, NewUser, User};
use crate::repositories::Store;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid")
});

const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub fn looks_like_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Argon2id hash in PHC string format.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Identity carried by a valid session token.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub username: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    token_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: String, token_ttl_seconds: i64) -> Self {
        Self {
            store,
            jwt_secret,
            token_ttl_seconds,
        }
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    pub async fn signup(&self, mut input: SignupIn) -> AppResult<User> {
        input.username = input.username.trim().to_string();
        input.first_name = non_blank(input.first_name);
        input.last_name = non_blank(input.last_name);
        input.email = non_blank(input.email).map(|e| e.to_lowercase());

        let mut errors = match input.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if input.username.is_empty() {
            errors.add("username", REQUIRED_MESSAGE);
        } else if !looks_like_username(&input.username) {
            errors.add("username", INVALID_USERNAME);
        }
        errors.into_result().map_err(AppError::Validation)?;

        let password_hash = hash_password(&input.password)?;
        let created = self
            .store
            .create_user(NewUser {
                username: input.username,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                email: input.email,
            })
            .await;

        match created {
            Ok(user) => {
                info!("New user registered: {}", user.username);
                Ok(user)
            }
            Err(AppError::Conflict(_)) => {
                let mut errors = FormErrors::new();
                errors.add("username", DUPLICATE_USERNAME);
                Err(AppError::Validation(errors))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn login(&self, input: LoginIn) -> AppResult<(SessionOut, User)> {
        input
            .validate()
            .map_err(|e| AppError::Validation(FormErrors::from(e)))?;

        let user = self.store.find_user_by_username(input.username.trim()).await?;
        let user = match user {
            Some(user) if verify_password(&input.password, &user.password_hash) => user,
            _ => {
                warn!("Failed login attempt for username '{}'", input.username.trim());
                let mut errors = FormErrors::new();
                errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
                return Err(AppError::Validation(errors));
            }
        };

        let session = SessionOut {
            access_token: self.issue_token(&user)?,
            expires_in: self.token_ttl_seconds,
            token_type: "Bearer".to_string(),
        };
        info!("User logged in: {}", user.username);
        Ok((session, user))
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.max(0) as usize,
            exp: (now + self.token_ttl_seconds).max(0) as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Checks signature and expiry; no store lookup.
    pub fn decode_token(&self, token: &str) -> AppResult<SessionIdentity> {
        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {}", e)))?;

        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("invalid token subject".to_string()))?;

        Ok(SessionIdentity {
            user_id,
            username: data.claims.username,
        })
    }
}
