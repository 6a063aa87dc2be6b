//! Allow-list gate for partial updates.
//!
//! A patch body is checked key by key before anything is deserialized or
//! written, so an update that names a single forbidden field changes nothing.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

/// Returns an error unless `body` is a JSON object whose keys all appear in `allowed`.
pub fn ensure_allowed_updates(body: &Value, allowed: &[&str]) -> Result<(), AppError> {
    let fields = body
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Update body must be a JSON object".into()))?;

    match fields.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => {
            log::debug!("rejected update touching {:?}", key);
            Err(AppError::BadRequest("Invalid updates!".into()))
        }
        None => Ok(()),
    }
}

/// Runs the allow-list check, then deserializes the patch.
///
/// Field values are validated later, after normalization, by the store that
/// applies the patch.
pub fn parse_patch<T>(body: Value, allowed: &[&str]) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    ensure_allowed_updates(&body, allowed)?;
    serde_json::from_value(body).map_err(|e| AppError::ValidationError(e.to_string()))
}
