// Database module
// 역할: PostgreSQL 연결과 레포지토리
pub mod connection;
pub mod repositories;

pub use connection::Database;
pub use repositories::*;
