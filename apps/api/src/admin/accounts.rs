use tracing::info;

use crate::admin::store::ProfileStore;
use crate::auth::Caller;
use crate::deliveries::registration::is_email_shaped;
use crate::errors::AppError;
use crate::models::profile::{PreauthorizedEmail, Profile};

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_email_shaped(&email) {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid email address",
            raw.trim()
        )));
    }
    Ok(email)
}

pub async fn list_users(store: &dyn ProfileStore, caller: &Caller) -> Result<Vec<Profile>, AppError> {
    caller.require_admin()?;
    Ok(store.list().await?)
}

pub async fn list_preauthorized(
    store: &dyn ProfileStore,
    caller: &Caller,
) -> Result<Vec<PreauthorizedEmail>, AppError> {
    caller.require_admin()?;
    Ok(store.list_preauthorized().await?)
}

/// Allows `email` to register. Adding an address twice is a no-op.
pub async fn add_preauthorized(
    store: &dyn ProfileStore,
    caller: &Caller,
    email: &str,
) -> Result<PreauthorizedEmail, AppError> {
    caller.require_admin()?;
    let email = normalize_email(email)?;
    let row = store.add_preauthorized(&email, caller.user_id).await?;
    info!(user_id = %caller.user_id, "Preauthorized {email}");
    Ok(row)
}

pub async fn remove_preauthorized(
    store: &dyn ProfileStore,
    caller: &Caller,
    email: &str,
) -> Result<(), AppError> {
    caller.require_admin()?;
    let email = email.trim().to_lowercase();
    if !store.remove_preauthorized(&email).await? {
        return Err(AppError::NotFound(format!("{email} is not preauthorized")));
    }
    info!(user_id = %caller.user_id, "Removed preauthorization of {email}");
    Ok(())
}
