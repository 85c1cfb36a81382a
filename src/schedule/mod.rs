//! Timetable scheduling rules: term classification, slot resolution,
//! eligibility, conflict detection and credit ceilings.
//!
//! Everything here is synchronous and pure; callers own the plan and
//! persist whatever comes back.

pub mod rules;
pub mod slots;
pub mod term;

pub use rules::{
    Conflict, CreditStatus, Rejection, credit_limit, credit_status, is_eligible, remove, total_credits, try_add,
};
pub use slots::{is_off_grid, resolve_slots};
pub use term::{Quarter, TermType, classify_term, is_on_demand};
