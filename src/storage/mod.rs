//! Local storage for uploaded user avatars and tag images.

mod image_store;

pub use image_store::{ALLOWED_IMAGE_EXTENSIONS, ImageKind, ImageStore, UploadError, UploadedFile};
