//! Response bodies and the client-facing messages handlers return.

use serde::Serialize;

use orderdesk_core::User;

pub const USER_CREATED: &str = "user created successfully";
pub const EMAIL_TAKEN: &str = "email already associated with a user";
pub const INCORRECT_EMAIL: &str = "incorrect email";
pub const INCORRECT_PASSWORD: &str = "incorrect password";

/// `POST /users` success body: the stored record (password field holds the
/// hash) plus a confirmation message.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
