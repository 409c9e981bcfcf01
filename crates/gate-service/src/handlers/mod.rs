//! HTTP request handlers for the gate service.

mod auth_hook;
mod health;
mod me;
mod metrics;
mod pages;
mod records;
mod upload_image;

pub use auth_hook::{auth_user_created, extract_user, HookUser};
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use pages::{render_page, PageResponse};
pub use records::{create_record, list_records};
pub use upload_image::{upload_image, DEFAULT_BUCKET, MAX_UPLOAD_BYTES};
