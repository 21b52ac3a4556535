// Wallet domain: 지갑 잔액, 거래 기록
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
