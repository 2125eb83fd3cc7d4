pub mod category_service;
pub mod session_service;
pub mod sync_service;

pub use category_service::CategoryService;
pub use session_service::{SessionEvent, SessionService};
pub use sync_service::SyncService;
