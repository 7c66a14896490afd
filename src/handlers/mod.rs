pub mod balance;
pub mod cold_rooms;
pub mod health;
pub mod loading;
pub mod pallets;
pub mod size_groups;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub balance: Arc<crate::services::balance::BalanceService>,
    pub size_groups: Arc<crate::services::size_groups::SizeGroupService>,
    pub loading: Arc<crate::services::loading::LoadingService>,
    pub pallets: Arc<crate::services::pallets::PalletService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let balance = Arc::new(crate::services::balance::BalanceService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let size_groups = Arc::new(crate::services::size_groups::SizeGroupService::new(
            db_pool.clone(),
            balance.clone(),
        ));
        let loading = Arc::new(crate::services::loading::LoadingService::new(
            db_pool.clone(),
            balance.clone(),
            event_sender.clone(),
        ));
        let pallets = Arc::new(crate::services::pallets::PalletService::new(
            db_pool,
            event_sender,
        ));
        Self {
            balance,
            size_groups,
            loading,
            pallets,
        }
    }
}
