pub mod common;
pub mod crates_api;
pub mod export;
pub mod health;
pub mod pages;

use crate::{db::DbPool, services::crates::CrateService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub crates: Arc<CrateService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            crates: Arc::new(CrateService::new(db)),
        }
    }
}
