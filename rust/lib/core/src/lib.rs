pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use module::Module;
pub use types::{
    ListParams, ListResult, format_rfc3339, merge_patch, new_id, now_rfc3339, parse_rfc3339,
};
