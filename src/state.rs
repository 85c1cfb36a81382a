use std::sync::Arc;

use crate::catalog::CatalogCache;
use crate::services::PlannerService;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<PlannerService>,
    pub catalog: Arc<CatalogCache>,
}
