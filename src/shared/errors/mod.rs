// Shared errors
pub mod wallet_error;
pub mod repository_error;
pub mod cache_error;

pub use wallet_error::*;
pub use repository_error::*;
pub use cache_error::*;
