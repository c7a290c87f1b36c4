use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::auth::{AdminUser, CurrentUser};
use crate::db::entities::user;
use crate::db::services;
use crate::services::auth_service::{self, ProfileChanges};
use crate::storage::ImageKind;
use crate::web::models::{CurrentUserResponse, ListQuery, Pagination, UserResponse, UsersPage};
use crate::web::routes::{parse_id, settle_replaced_image, store_submitted_image};
use crate::web::{AppState, error::AppError, extract::SubmittedForm};

pub fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(get_current_user_handler))
        .route("/user/edit", patch(edit_current_user_handler))
        .route("/user/edit/{id}", patch(edit_user_by_id_handler))
        .route("/users", get(list_users_handler))
}

async fn user_response(app_state: &AppState, user: &user::Model) -> Result<UserResponse, AppError> {
    let tags = services::get_tags_for_user(&app_state.db_pool, user.id).await?;
    Ok(UserResponse::from_model(user, &tags, app_state.base_url()))
}

/// Shared by the self-service and admin edit endpoints. Only submitted,
/// non-empty fields change; a new image replaces the old file on success.
async fn apply_profile_edit(
    app_state: &AppState,
    target: user::Model,
    form: SubmittedForm,
) -> Result<UserResponse, AppError> {
    let email = form.owned_text("email");
    if let Some(email) = &email {
        if !auth_service::is_valid_email(email) {
            return Err(AppError::InvalidInput("Invalid email format.".to_string()));
        }
    }

    let new_image = store_submitted_image(app_state, ImageKind::User, &form).await?;
    let old_image = target.image.clone();
    let changes = ProfileChanges {
        email,
        password: form.owned_text("password"),
        name: form.owned_text("name"),
        image: new_image.clone(),
    };

    let result = auth_service::update_profile(
        &app_state.db_pool,
        app_state.password_hasher,
        target,
        changes,
    )
    .await;
    settle_replaced_image(
        app_state,
        ImageKind::User,
        &result,
        new_image.as_deref(),
        old_image.as_deref(),
    )
    .await;

    let updated = result?;
    user_response(app_state, &updated).await
}

async fn get_current_user_handler(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let user = user_response(&app_state, &identity).await?;
    Ok(Json(CurrentUserResponse { user }))
}

async fn edit_current_user_handler(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    form: SubmittedForm,
) -> Result<Json<UserResponse>, AppError> {
    apply_profile_edit(&app_state, identity, form).await.map(Json)
}

async fn edit_user_by_id_handler(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(raw_id): Path<String>,
    form: SubmittedForm,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = parse_id(&raw_id, "user")?;
    let target = services::find_user_by_id(&app_state.db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    apply_profile_edit(&app_state, target, form).await.map(Json)
}

async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<Json<UsersPage>, AppError> {
    let page = query.page()?;
    let page_size = query.page_size();

    let (users, total_items) =
        services::list_users(&app_state.db_pool, query.search_term(), page, page_size).await?;

    let mut responses = Vec::with_capacity(users.len());
    for user in &users {
        responses.push(user_response(&app_state, user).await?);
    }

    Ok(Json(UsersPage {
        users: responses,
        pagination: Pagination::new(total_items, page, page_size),
    }))
}
