use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::services;
use crate::web::models::{SearchQuery, SearchResponse, TagResponse, UserResponse};
use crate::web::{AppState, error::AppError};

pub fn create_search_router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search_handler))
}

/// Substring search over tag names and user names/emails. An empty `q`
/// matches everything.
async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    _identity: CurrentUser,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, AppError>,
) -> Result<Json<SearchResponse>, AppError> {
    let db = &app_state.db_pool;
    let base_url = app_state.base_url();
    let term = query.q.trim();

    let tags = services::search_tags(db, term).await?;
    let users = services::search_users(db, term).await?;

    if tags.is_empty() && users.is_empty() {
        return Ok(Json(SearchResponse::Empty {
            message: "No results found".to_string(),
        }));
    }

    let mut tag_responses = Vec::with_capacity(tags.len());
    for tag in &tags {
        let members = services::get_users_for_tag(db, tag.id).await?;
        tag_responses.push(TagResponse::from_model(tag, &members, base_url));
    }
    let mut user_responses = Vec::with_capacity(users.len());
    for user in &users {
        let user_tags = services::get_tags_for_user(db, user.id).await?;
        user_responses.push(UserResponse::from_model(user, &user_tags, base_url));
    }

    Ok(Json(SearchResponse::Results {
        tags: tag_responses,
        users: user_responses,
    }))
}
