use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::Method,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::{AUTH_COOKIE_NAME, PasswordHasher, TokenCodec, TokenError};
use crate::auth::token::TOKEN_LIFETIME_DAYS;
use crate::db::enums::Role;
use crate::server::config::ServerConfig;
use crate::services::auth_service::{self, NewIdentity};
use crate::storage::{ImageKind, ImageStore};
use crate::web::{
    error::AppError,
    extract::SubmittedForm,
    models::{LoginRequest, LoginResponse, MessageResponse},
    routes::*,
};

pub mod error;
pub mod extract;
pub mod models;
pub mod routes;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub token_codec: Arc<TokenCodec>,
    pub password_hasher: PasswordHasher,
    pub image_store: Arc<ImageStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Result<Self, TokenError> {
        Ok(Self {
            db_pool,
            token_codec: Arc::new(TokenCodec::new(&config)?),
            password_hasher: PasswordHasher::new(config.password_cost),
            image_store: Arc::new(ImageStore::new(&config.image_dir)),
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    form: SubmittedForm,
) -> Result<Json<MessageResponse>, AppError> {
    let email = form.owned_text("email").unwrap_or_default();
    // Reject a bad address before anything is written to disk.
    if !auth_service::is_valid_email(&email) {
        return Err(AppError::InvalidInput("Invalid email format.".to_string()));
    }
    let role = if form.flag("admin")? { Role::Admin } else { Role::Standard };

    let image = store_submitted_image(&app_state, ImageKind::User, &form).await?;
    let request = NewIdentity {
        email,
        password: form.owned_text("password").unwrap_or_default(),
        name: form.owned_text("name").unwrap_or_default(),
        role,
        image: image.clone(),
    };

    match auth_service::register_user(&app_state.db_pool, app_state.password_hasher, request).await {
        Ok(_) => Ok(Json(MessageResponse::new("User created successfully"))),
        Err(e) => {
            if let Some(name) = image {
                app_state.image_store.discard(ImageKind::User, &name).await;
            }
            Err(e)
        }
    }
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    form: SubmittedForm,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let request = LoginRequest {
        email: form.owned_text("email").unwrap_or_default(),
        password: form.owned_text("password").unwrap_or_default(),
    };
    let session = auth_service::login_user(
        &app_state.db_pool,
        app_state.password_hasher,
        &app_state.token_codec,
        request,
        Utc::now(),
    )
    .await?;

    let auth_cookie = Cookie::build((AUTH_COOKIE_NAME, session.token))
        .path("/")
        .max_age(time::Duration::days(TOKEN_LIFETIME_DAYS))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(false)
        .build();

    Ok((
        jar.add(auth_cookie),
        Json(LoginResponse {
            user_id: session.user_id,
            email: session.email,
        }),
    ))
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    let user_images = ServeDir::new(app_state.image_store.dir(ImageKind::User));
    let tag_images = ServeDir::new(app_state.image_store.dir(ImageKind::Tag));

    Router::new()
        .route("/health", get(health_check_handler))
        .route("/signup", post(register_handler))
        .route("/login", post(login_handler))
        .merge(user_routes::create_user_router())
        .merge(tag_routes::create_tag_router())
        .merge(search_routes::create_search_router())
        .nest_service("/image/user", user_images)
        .nest_service("/image/tag", tag_images)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
