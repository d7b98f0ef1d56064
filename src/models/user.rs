use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_joined: DateTime<Utc>,
}

/// Insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Redacted user sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        UserPublic {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// JWT claims issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// user id as a string
    pub sub: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}
