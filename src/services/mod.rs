pub mod planner;

pub use planner::{PlannerService, STORAGE_KEY};
