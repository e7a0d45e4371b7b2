pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::{ProgressFn, StorageBackend};
pub use crate::models::{Access, DEFAULT_AUTHORIZATION_ENDPOINT, Receipt, UploadOptions};
pub use crate::path::{to_key, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
