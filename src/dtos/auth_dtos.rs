use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::UserPublic;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupIn {
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginIn {
    #[validate(length(min = 1, code = "required"))]
    pub username: String,
    #[validate(length(min = 1, code = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOut {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: UserPublic,
    pub next_step: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: SessionOut,
    pub user: UserPublic,
    /// Where the client should go next (`?next=`, or the index).
    pub redirect_to: String,
}
