pub mod course;
pub mod plan;

pub use course::{Course, Weekday};
pub use plan::{Plan, PlanError, PlanId, PlanSet, SlotKey};
