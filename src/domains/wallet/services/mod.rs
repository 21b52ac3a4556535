// Wallet domain services
pub mod state;
pub mod wallet_service;

pub use state::WalletState;
pub use wallet_service::{WalletService, WalletServiceConfig};
