pub mod error;
pub mod json_bridge;
pub mod library;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use library::{Config, Library, default_base_dir};
pub use store::Store;
