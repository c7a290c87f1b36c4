use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::auth::{AdminUser, CurrentUser};
use crate::db::entities::tag;
use crate::db::services::{self, TagChanges};
use crate::storage::ImageKind;
use crate::web::models::{ListQuery, MessageResponse, Pagination, TagResponse, TagsPage};
use crate::web::routes::{parse_id, settle_replaced_image, store_submitted_image};
use crate::web::{AppState, error::AppError, extract::SubmittedForm};

pub fn create_tag_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags", get(list_tags_handler))
        .route("/tag", post(create_tag_handler))
        .route("/tag/edit/{id}", patch(edit_tag_handler))
        .route("/user/tag/{id}", post(add_tag_to_user_handler))
}

async fn tag_response(app_state: &AppState, tag: &tag::Model) -> Result<TagResponse, AppError> {
    let users = services::get_users_for_tag(&app_state.db_pool, tag.id).await?;
    Ok(TagResponse::from_model(tag, &users, app_state.base_url()))
}

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
    _identity: CurrentUser,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<Json<TagsPage>, AppError> {
    let order = query.order()?;
    let page = query.page()?;
    let page_size = query.page_size();

    let (tags, total_items) =
        services::list_tags(&app_state.db_pool, query.search_term(), order, page, page_size).await?;

    let mut responses = Vec::with_capacity(tags.len());
    for tag in &tags {
        responses.push(tag_response(&app_state, tag).await?);
    }

    Ok(Json(TagsPage {
        tags: responses,
        pagination: Pagination::new(total_items, page, page_size),
    }))
}

async fn create_tag_handler(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    form: SubmittedForm,
) -> Result<Json<MessageResponse>, AppError> {
    let name = form
        .text("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Tag name is required.".to_string()))?;

    let image = store_submitted_image(&app_state, ImageKind::Tag, &form).await?;
    if let Err(e) = services::create_tag(&app_state.db_pool, name, image.clone()).await {
        if let Some(stored) = image {
            app_state.image_store.discard(ImageKind::Tag, &stored).await;
        }
        return Err(e);
    }

    Ok(Json(MessageResponse::new("Tag created successfully")))
}

async fn edit_tag_handler(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(raw_id): Path<String>,
    form: SubmittedForm,
) -> Result<Json<TagResponse>, AppError> {
    let tag_id = parse_id(&raw_id, "tag")?;
    let existing = services::find_tag_by_id(&app_state.db_pool, tag_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let new_image = store_submitted_image(&app_state, ImageKind::Tag, &form).await?;
    let old_image = existing.image.clone();
    let changes = TagChanges {
        name: form.owned_text("name"),
        image: new_image.clone(),
    };

    let result = services::update_tag(&app_state.db_pool, existing, changes).await;
    settle_replaced_image(
        &app_state,
        ImageKind::Tag,
        &result,
        new_image.as_deref(),
        old_image.as_deref(),
    )
    .await;

    let updated = result?;
    tag_response(&app_state, &updated).await.map(Json)
}

async fn add_tag_to_user_handler(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(raw_id): Path<String>,
    form: SubmittedForm,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = parse_id(&raw_id, "user")?;
    let target = services::find_user_by_id(&app_state.db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let tag_name = form.text("name").unwrap_or_default();
    services::add_tag_to_user(&app_state.db_pool, &target, tag_name).await?;

    Ok(Json(MessageResponse::new("Tag added to user successfully")))
}
