pub mod search_routes;
pub mod tag_routes;
pub mod user_routes;

use crate::storage::{ALLOWED_IMAGE_EXTENSIONS, ImageKind};
use crate::web::{AppState, error::AppError, extract::SubmittedForm};

/// Saves the image part of `form`, if one was submitted, and returns its
/// stored filename.
pub(crate) async fn store_submitted_image(
    app_state: &AppState,
    kind: ImageKind,
    form: &SubmittedForm,
) -> Result<Option<String>, AppError> {
    match form.image() {
        None => Ok(None),
        Some(file) => {
            let name = app_state
                .image_store
                .save(kind, Some(file), ALLOWED_IMAGE_EXTENSIONS)
                .await?;
            Ok(Some(name))
        }
    }
}

/// After an update: drops the image that was just written if the update
/// failed, or the image it replaced if it succeeded.
pub(crate) async fn settle_replaced_image<T>(
    app_state: &AppState,
    kind: ImageKind,
    result: &Result<T, AppError>,
    new_image: Option<&str>,
    old_image: Option<&str>,
) {
    let Some(new_image) = new_image else {
        return;
    };
    let stale = match result {
        Ok(_) => old_image.filter(|old| *old != new_image),
        Err(_) => Some(new_image),
    };
    if let Some(name) = stale {
        app_state.image_store.discard(kind, name).await;
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid {what} ID")))
}
