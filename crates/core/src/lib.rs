//! Shared building blocks for LeadNectar services: errors, configuration,
//! domain events, lifecycle tables, and the template catalog.

pub mod config;
pub mod error;
pub mod event_bus;
pub mod lifecycle;
pub mod templates;
pub mod types;

pub use config::AppConfig;
pub use error::{DanglingReference, NectarError, NectarResult};
pub use templates::TemplateCatalog;
