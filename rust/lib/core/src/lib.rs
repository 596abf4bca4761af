pub mod clock;
pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use error::{error_body, ServiceError};
pub use module::Module;
pub use types::{ListParams, ListResult, format_display, format_storage, parse_storage};
