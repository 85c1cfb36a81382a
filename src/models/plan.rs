use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::course::{Course, Weekday};

pub const DEFAULT_PLAN_NAME: &str = "Main Plan";

/// Key of a placement inside a plan.
///
/// Grid slots look like `Mon-2-Q1`; session and on-demand courses use the
/// pseudo keys `Session|<code>|<term>` and `OnDemand|<code>|<term>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotKey(String);

impl SlotKey {
    pub fn grid(day: Weekday, period: u8, quarter: &str) -> Self {
        Self(format!("{}-{}-{}", day.as_str(), period, quarter))
    }

    pub fn session(subject_code: &str, term: &str) -> Self {
        Self(format!("Session|{}|{}", subject_code, term))
    }

    pub fn on_demand(subject_code: &str, term: &str) -> Self {
        Self(format!("OnDemand|{}|{}", subject_code, term))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_session(&self) -> bool {
        self.0.starts_with("Session|")
    }

    pub fn is_on_demand(&self) -> bool {
        self.0.starts_with("OnDemand|")
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn generate() -> Self {
        Self(format!("plan_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlanId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: String,
    #[serde(default)]
    pub planned_courses: BTreeMap<SlotKey, Course>,
}

impl Plan {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            planned_courses: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &SlotKey) -> Option<&Course> {
        self.planned_courses.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.planned_courses.is_empty()
    }

    /// Planned courses with one entry per `(subjectCode, term)`, so a
    /// semester course sitting in two quarter slots shows up once.
    pub fn unique_courses(&self) -> Vec<&Course> {
        let mut seen = BTreeMap::new();
        for course in self.planned_courses.values() {
            seen.entry(course.plan_key()).or_insert(course);
        }
        seen.into_values().collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot delete the only remaining plan")]
    LastPlan,

    #[error("no plan with id {0}")]
    UnknownPlan(PlanId),

    #[error("plan name must not be empty")]
    EmptyName,
}

/// Every saved plan plus the one currently being edited.
///
/// Operations never mutate in place; each returns the next `PlanSet`, which
/// the caller persists as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSet {
    plans: BTreeMap<PlanId, Plan>,
    current_plan_id: PlanId,
}

impl Default for PlanSet {
    fn default() -> Self {
        let id = PlanId::generate();
        let mut plans = BTreeMap::new();
        plans.insert(id.clone(), Plan::named(DEFAULT_PLAN_NAME));
        Self {
            plans,
            current_plan_id: id,
        }
    }
}

impl PlanSet {
    /// Rebuilds a `PlanSet` from its parts, repairing a dangling current id.
    /// Returns `None` when there are no plans at all.
    pub fn from_parts(plans: BTreeMap<PlanId, Plan>, current_plan_id: PlanId) -> Option<Self> {
        let current_plan_id = if plans.contains_key(&current_plan_id) {
            current_plan_id
        } else {
            plans.keys().next()?.clone()
        };
        Some(Self {
            plans,
            current_plan_id,
        })
    }

    /// Re-checks invariants after deserialization.
    pub fn into_valid(self) -> Option<Self> {
        Self::from_parts(self.plans, self.current_plan_id)
    }

    pub fn plans(&self) -> &BTreeMap<PlanId, Plan> {
        &self.plans
    }

    pub fn current_plan_id(&self) -> &PlanId {
        &self.current_plan_id
    }

    pub fn current(&self) -> &Plan {
        // current_plan_id is kept valid by every constructor and transition
        &self.plans[&self.current_plan_id]
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Replaces the current plan's contents.
    pub fn with_current(&self, plan: Plan) -> PlanSet {
        let mut next = self.clone();
        next.plans.insert(self.current_plan_id.clone(), plan);
        next
    }

    pub fn create_plan(&self) -> PlanSet {
        self.push_plan(Plan::named(self.next_plan_name()))
    }

    pub fn duplicate_plan(&self) -> PlanSet {
        let plan = Plan {
            name: self.next_plan_name(),
            planned_courses: self.current().planned_courses.clone(),
        };
        self.push_plan(plan)
    }

    pub fn rename_plan(&self, name: &str) -> Result<PlanSet, PlanError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlanError::EmptyName);
        }
        let mut plan = self.current().clone();
        plan.name = name.to_string();
        Ok(self.with_current(plan))
    }

    pub fn delete_plan(&self) -> Result<PlanSet, PlanError> {
        if self.plans.len() <= 1 {
            return Err(PlanError::LastPlan);
        }
        let mut plans = self.plans.clone();
        plans.remove(&self.current_plan_id);
        let current_plan_id = plans.keys().next().cloned().ok_or(PlanError::LastPlan)?;
        Ok(PlanSet {
            plans,
            current_plan_id,
        })
    }

    pub fn select_plan(&self, id: &PlanId) -> Result<PlanSet, PlanError> {
        if !self.plans.contains_key(id) {
            return Err(PlanError::UnknownPlan(id.clone()));
        }
        Ok(PlanSet {
            plans: self.plans.clone(),
            current_plan_id: id.clone(),
        })
    }

    /// Empties the current plan but keeps its name.
    pub fn clear_current(&self) -> PlanSet {
        self.with_current(Plan::named(self.current().name.clone()))
    }

    fn push_plan(&self, plan: Plan) -> PlanSet {
        let id = PlanId::generate();
        let mut plans = self.plans.clone();
        plans.insert(id.clone(), plan);
        PlanSet {
            plans,
            current_plan_id: id,
        }
    }

    fn next_plan_name(&self) -> String {
        format!("Plan {}", self.plans.len() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::fixtures::course;

    fn with_one_course() -> PlanSet {
        let set = PlanSet::default();
        let mut plan = set.current().clone();
        plan.planned_courses
            .insert(SlotKey::from("Mon-2-Q1"), course("ABC12345", "Mon", 2, "1Q", 2, 1));
        set.with_current(plan)
    }

    #[test]
    fn test_default_has_single_main_plan() {
        let set = PlanSet::default();
        assert_eq!(set.len(), 1);
        assert_eq!(set.current().name, DEFAULT_PLAN_NAME);
        assert!(set.current().is_empty());
    }

    #[test]
    fn test_create_plan_becomes_current() {
        let set = with_one_course();
        let next = set.create_plan();

        assert_eq!(next.len(), 2);
        assert_ne!(next.current_plan_id(), set.current_plan_id());
        assert_eq!(next.current().name, "Plan 2");
        assert!(next.current().is_empty());
        // the original value is untouched
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_duplicate_plan_copies_courses() {
        let set = with_one_course();
        let next = set.duplicate_plan();

        assert_eq!(next.len(), 2);
        assert_eq!(next.current().planned_courses, set.current().planned_courses);
    }

    #[test]
    fn test_rename_trims_and_rejects_empty() {
        let set = PlanSet::default();
        let renamed = set.rename_plan("  Year 2  ").expect("rename failed");
        assert_eq!(renamed.current().name, "Year 2");
        assert_eq!(set.rename_plan("   "), Err(PlanError::EmptyName));
    }

    #[test]
    fn test_delete_last_plan_is_rejected() {
        let set = PlanSet::default();
        assert_eq!(set.delete_plan(), Err(PlanError::LastPlan));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_delete_moves_current_to_remaining_plan() {
        let set = PlanSet::default().create_plan();
        let deleted_id = set.current_plan_id().clone();
        let next = set.delete_plan().expect("delete failed");

        assert_eq!(next.len(), 1);
        assert!(!next.plans().contains_key(&deleted_id));
        assert!(next.plans().contains_key(next.current_plan_id()));
    }

    #[test]
    fn test_select_unknown_plan() {
        let set = PlanSet::default();
        let missing = PlanId::from("plan_missing");
        assert_eq!(set.select_plan(&missing), Err(PlanError::UnknownPlan(missing.clone())));
    }

    #[test]
    fn test_clear_current_keeps_name() {
        let set = with_one_course().rename_plan("Mine").expect("rename failed");
        let cleared = set.clear_current();
        assert!(cleared.current().is_empty());
        assert_eq!(cleared.current().name, "Mine");
    }

    #[test]
    fn test_persisted_layout() {
        let set = with_one_course();
        let value = serde_json::to_value(&set).expect("serialize failed");
        let id = set.current_plan_id().as_str();

        assert_eq!(value["currentPlanId"], id);
        assert_eq!(value["plans"][id]["name"], DEFAULT_PLAN_NAME);
        assert_eq!(
            value["plans"][id]["plannedCourses"]["Mon-2-Q1"]["subjectCode"],
            "ABC12345"
        );
    }

    #[test]
    fn test_dangling_current_is_repaired() {
        let raw = r#"{
            "plans": { "plan_a": { "name": "A", "plannedCourses": {} } },
            "currentPlanId": "plan_gone"
        }"#;
        let set: PlanSet = serde_json::from_str(raw).expect("parse failed");
        let set = set.into_valid().expect("plans should not be empty");
        assert_eq!(set.current_plan_id().as_str(), "plan_a");
    }

    #[test]
    fn test_empty_plans_are_invalid() {
        let raw = r#"{ "plans": {}, "currentPlanId": "plan_a" }"#;
        let set: PlanSet = serde_json::from_str(raw).expect("parse failed");
        assert!(set.into_valid().is_none());
    }
}
