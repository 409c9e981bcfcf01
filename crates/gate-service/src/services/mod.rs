//! Services behind the function endpoints.
//!
//! - `image_store`: uploaded meal images
//! - `record_store`: meal/exercise records, scoped by verified subject
//! - `user_directory`: users registered by the user-created webhook

pub mod image_store;
pub mod record_store;
pub mod user_directory;

pub use image_store::{ImageStore, InMemoryImageStore, StoredImage};
pub use record_store::{InMemoryRecordStore, RecordStore};
pub use user_directory::{InMemoryUserDirectory, RegisteredUser, UserDirectory};
