// Shared module
pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod services;

pub use config::*;
pub use errors::*;
pub use services::*;
