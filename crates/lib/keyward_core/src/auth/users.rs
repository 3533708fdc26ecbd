//! User registration.

use tracing::info;
use validator::{Validate, ValidationError, ValidationErrors};

use super::AuthError;
use super::password::hash_password;
use super::store::UserStore;
use crate::models::auth::{NewUser, User};

/// Registration input with the plaintext password.
#[derive(Debug, Clone, Validate)]
pub struct Registration {
    #[validate(custom(function = "not_blank", message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Email address is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Create a user after checking that username and email are free.
///
/// The username check runs first, so a request colliding on both reports
/// `UsernameAlreadyExists`. Two concurrent registrations can both pass the
/// checks; the store's unique constraints then reject the second insert with
/// the same errors.
pub async fn register(
    users: &dyn UserStore,
    registration: Registration,
) -> Result<User, AuthError> {
    registration
        .validate()
        .map_err(|e| AuthError::Validation(first_message(&e)))?;

    if users.username_exists(&registration.username).await? {
        return Err(AuthError::UsernameAlreadyExists);
    }
    if users.email_exists(&registration.email).await? {
        return Err(AuthError::EmailAlreadyExists);
    }

    let password_hash = hash_password(&registration.password)?;
    let user = users
        .insert(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Message of the first failing rule, in field order.
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    ["username", "email", "password"]
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
