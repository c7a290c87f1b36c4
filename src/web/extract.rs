use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde_json::Value;

use crate::storage::UploadedFile;
use crate::web::error::AppError;

/// Multipart field that carries an uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// A submitted form, whatever its encoding.
///
/// Accepts `multipart/form-data`, `application/x-www-form-urlencoded` and
/// `application/json` bodies. Field names are matched case-insensitively. A
/// request without a content type is treated as an empty submission.
#[derive(Debug, Default)]
pub struct SubmittedForm {
    fields: HashMap<String, String>,
    image: Option<UploadedFile>,
}

impl SubmittedForm {
    /// The value of `key`, if it was submitted and is not empty.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn owned_text(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_string)
    }

    /// Parses a boolean flag. Missing means `false`.
    pub fn flag(&self, key: &str) -> Result<bool, AppError> {
        match self.text(key) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("on") => {
                Ok(true)
            }
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" || v.eq_ignore_ascii_case("off") => {
                Ok(false)
            }
            Some(_) => Err(AppError::InvalidInput(format!("Invalid value for field '{key}'"))),
        }
    }

    pub fn image(&self) -> Option<&UploadedFile> {
        self.image.as_ref()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.fields.insert(key.to_ascii_lowercase(), value);
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut form = Self::default();
        for (k, v) in pairs {
            form.insert(k, v.to_string());
        }
        form
    }
}

fn malformed(what: &str, err: impl std::fmt::Display) -> AppError {
    AppError::InvalidInput(format!("Malformed {what} body: {err}"))
}

async fn read_multipart(mut multipart: Multipart) -> Result<SubmittedForm, AppError> {
    let mut form = SubmittedForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed("multipart", e))?
    {
        let Some(name) = field.name().map(str::to_ascii_lowercase) else {
            continue;
        };
        match field.file_name().map(str::to_string) {
            Some(file_name) if name == IMAGE_FIELD => {
                let bytes = field.bytes().await.map_err(|e| malformed("multipart", e))?;
                // Browsers send an empty file part when no file was chosen.
                if !file_name.is_empty() {
                    form.image = Some(UploadedFile { file_name, bytes });
                }
            }
            Some(_) => {}
            None => {
                let value = field.text().await.map_err(|e| malformed("multipart", e))?;
                form.insert(&name, value);
            }
        }
    }
    Ok(form)
}

fn from_json(map: serde_json::Map<String, Value>) -> SubmittedForm {
    let mut form = SubmittedForm::default();
    for (key, value) in map {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s,
            other => other.to_string(),
        };
        form.insert(&key, value);
    }
    form
}

impl<S> FromRequest<S> for SubmittedForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        match content_type.as_deref() {
            None => Ok(SubmittedForm::default()),
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| malformed("multipart", e))?;
                read_multipart(multipart).await
            }
            Some(ct) if ct.starts_with("application/json") => {
                let Json(map) = Json::<serde_json::Map<String, Value>>::from_request(req, state)
                    .await
                    .map_err(|e| malformed("JSON", e))?;
                Ok(from_json(map))
            }
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map_err(|e| malformed("form", e))?;
                let mut form = SubmittedForm::default();
                for (key, value) in pairs {
                    form.insert(&key, value);
                }
                Ok(form)
            }
            Some(other) => Err(AppError::InvalidInput(format!(
                "Unsupported content type: {other}"
            ))),
        }
    }
}
