pub mod ports;
pub mod services;

pub use services::{CategoryService, SessionEvent, SessionService, SyncService};
