use crate::domains::wallet::services::{WalletService, WalletState};

/// Application state (combines all domain states)
/// 애플리케이션 상태 (모든 도메인 상태를 조합)
///
/// 모든 컴포넌트는 main에서 한 번 생성되어 여기로 주입된다.
/// 요청 처리 중에 지연 생성되는 것은 없다.
#[derive(Clone)]
pub struct AppState {
    pub wallet_state: WalletState,
}

impl AppState {
    /// 조립된 WalletService로 AppState 생성
    pub fn new(wallet_service: WalletService) -> Self {
        Self {
            wallet_state: WalletState::new(wallet_service),
        }
    }
}
