// Wallet domain models
pub mod wallet;
pub mod transaction;
pub mod balance;

pub use wallet::*;
pub use transaction::*;
pub use balance::*;
