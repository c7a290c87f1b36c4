use sea_orm::Order;
use serde::{Deserialize, Serialize};

use crate::db::entities::{tag, user};
use crate::db::enums::Role;
use crate::storage::ImageKind;
use crate::web::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of a successful login. The session token travels only in the
/// `Set-Cookie` header.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i32,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public URL of a stored image, or `None` when nothing was uploaded.
pub fn image_url(base_url: &str, kind: ImageKind, image: Option<&str>) -> Option<String> {
    image
        .filter(|name| !name.is_empty())
        .map(|name| format!("{base_url}image/{}/{name}", kind.url_segment()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagSummary {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
}

impl TagSummary {
    pub fn from_model(tag: &tag::Model, base_url: &str) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
            image: image_url(base_url, ImageKind::Tag, tag.image.as_deref()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

impl UserSummary {
    pub fn from_model(user: &user::Model, base_url: &str) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: image_url(base_url, ImageKind::User, user.image.as_deref()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub admin: bool,
    pub image: Option<String>,
    pub tags: Vec<TagSummary>,
}

impl UserResponse {
    pub fn from_model(user: &user::Model, tags: &[tag::Model], base_url: &str) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            admin: user.role.is_admin(),
            image: image_url(base_url, ImageKind::User, user.image.as_deref()),
            tags: tags.iter().map(|t| TagSummary::from_model(t, base_url)).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub users: Vec<UserSummary>,
}

impl TagResponse {
    pub fn from_model(tag: &tag::Model, users: &[user::Model], base_url: &str) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
            image: image_url(base_url, ImageKind::Tag, tag.image.as_deref()),
            users: users.iter().map(|u| UserSummary::from_model(u, base_url)).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn new(total_items: u64, current_page: u64, page_size: u64) -> Self {
        Self {
            total_items,
            total_pages: total_items.div_ceil(page_size),
            current_page,
            page_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersPage {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsPage {
    pub tags: Vec<TagResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Results {
        tags: Vec<TagResponse>,
        users: Vec<UserResponse>,
    },
    Empty {
        message: String,
    },
}

/// Query string shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub sort: Option<String>,
}

impl ListQuery {
    /// The 1-based page number. Rejected when the row offset it implies does
    /// not fit a signed 64-bit SQL `OFFSET`.
    pub fn page(&self) -> Result<u64, AppError> {
        let page = self.page.unwrap_or(1).max(1);
        (page - 1)
            .checked_mul(self.page_size())
            .filter(|offset| i64::try_from(*offset).is_ok())
            .map(|_| page)
            .ok_or_else(|| AppError::InvalidInput("Invalid page".to_string()))
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn order(&self) -> Result<Order, AppError> {
        match self.sort.as_deref().unwrap_or("asc") {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            _ => Err(AppError::InvalidInput("Invalid sort order".to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
