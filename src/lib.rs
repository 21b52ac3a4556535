// Wallet ledger: 플레이어 지갑 잔액/거래 기록 서비스
pub mod domains;
pub mod routes;
pub mod shared;
