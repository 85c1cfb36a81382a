use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::course::parse_semester;
use crate::models::{Course, Plan, SlotKey};

use super::slots::{is_off_grid, resolve_slots};

/// Credit ceilings per target semester. Semesters past the table reuse the
/// last entry.
const CREDIT_LIMITS: [(u32, u32); 8] = [
    (1, 18),
    (2, 18),
    (3, 20),
    (4, 20),
    (5, 20),
    (6, 20),
    (7, 24),
    (8, 24),
];

const FALLBACK_CREDIT_LIMIT: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub slot: SlotKey,
    pub subject_code: String,
    pub name_en: String,
}

/// Why a course could not be added. These are user-facing outcomes, not
/// failures; the plan is left untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    #[error("course {subject_code} has no schedulable term ({term:?})")]
    Unplaceable { subject_code: String, term: String },

    #[error("course {subject_code} requires semester {required}, but the plan targets semester {target}")]
    Ineligible {
        subject_code: String,
        required: String,
        target: u32,
    },

    #[error("course {subject_code} ({term}) is already in your plan")]
    AlreadyPlanned { subject_code: String, term: String },

    #[error("one or more of its scheduled periods is already occupied by another course")]
    SlotConflict { conflicts: Vec<Conflict> },

    #[error("adding it would exceed the credit limit ({limit} credits) for this semester; your total would be {total} credits")]
    CreditLimitExceeded { total: u32, limit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditStatus {
    pub semester: u32,
    pub total: u32,
    pub limit: u32,
    pub over_limit: bool,
}

/// A course is eligible unless it names a later minimum semester than the
/// one being planned. Non-numeric markers never block.
pub fn is_eligible(course_semester: &str, target_semester: u32) -> bool {
    match parse_semester(course_semester) {
        Some(required) => f64::from(target_semester) >= required,
        None => true,
    }
}

pub fn credit_limit(semester: u32) -> u32 {
    let max_defined = CREDIT_LIMITS[CREDIT_LIMITS.len() - 1];
    if semester >= max_defined.0 {
        return max_defined.1;
    }
    CREDIT_LIMITS
        .iter()
        .find(|(s, _)| *s == semester)
        .map(|(_, limit)| *limit)
        .unwrap_or(FALLBACK_CREDIT_LIMIT)
}

/// Sum of credits for the plan, counting each `(subjectCode, term)` once.
/// Only courses whose numeric semester is at or below the target count.
pub fn total_credits(plan: &Plan, semester: u32) -> u32 {
    sum_credits(&counted_courses(plan, semester))
}

pub fn credit_status(plan: &Plan, semester: u32) -> CreditStatus {
    let total = total_credits(plan, semester);
    let limit = credit_limit(semester);
    CreditStatus {
        semester,
        total,
        limit,
        over_limit: total > limit,
    }
}

/// Validates adding `course` to `plan` for the target semester and returns
/// the resulting plan.
///
/// Grid courses bring along their related catalog rows (same subject code
/// and term, eligible for the semester), since a course that meets twice a
/// week is listed once per meeting. Every slot is checked before anything
/// is written.
pub fn try_add(course: &Course, plan: &Plan, catalog: &[Course], semester: u32) -> Result<Plan, Rejection> {
    if resolve_slots(course).is_empty() {
        return Err(Rejection::Unplaceable {
            subject_code: course.subject_code.clone(),
            term: course.term.clone(),
        });
    }

    if !is_eligible(&course.semester, semester) {
        return Err(Rejection::Ineligible {
            subject_code: course.subject_code.clone(),
            required: course.semester.clone(),
            target: semester,
        });
    }

    let already_planned = plan
        .planned_courses
        .values()
        .any(|c| c.subject_code == course.subject_code && c.term == course.term);
    if already_planned {
        return Err(Rejection::AlreadyPlanned {
            subject_code: course.subject_code.clone(),
            term: course.term.clone(),
        });
    }

    let placements = placements(course, catalog, semester);

    let mut conflicts: Vec<Conflict> = Vec::new();
    for (slot, _) in &placements {
        if let Some(existing) = plan.get(slot) {
            if existing.subject_code != course.subject_code {
                conflicts.push(Conflict {
                    slot: slot.clone(),
                    subject_code: existing.subject_code.clone(),
                    name_en: existing.name_en.clone(),
                });
            }
        }
    }
    if !conflicts.is_empty() {
        debug!(
            "rejecting {}: {} conflicting slot(s)",
            course.subject_code,
            conflicts.len()
        );
        return Err(Rejection::SlotConflict { conflicts });
    }

    let mut unique = counted_courses(plan, semester);
    unique.insert(course.plan_key(), course);
    for (_, related) in &placements {
        unique.insert(related.plan_key(), related);
    }
    let total = sum_credits(&unique);
    let limit = credit_limit(semester);
    if total > limit {
        return Err(Rejection::CreditLimitExceeded { total, limit });
    }

    let mut next = plan.clone();
    for (slot, related) in placements {
        next.planned_courses.insert(slot, related.clone());
    }
    Ok(next)
}

/// Drops every slot held by `course`. Session and on-demand entries are
/// matched on subject code and term. Grid entries are matched on subject
/// code alone, which clears both quarters of a semester course at once,
/// but never touch an off-grid entry of the same subject.
pub fn remove(course: &Course, plan: &Plan) -> Plan {
    let off_grid = is_off_grid(course);
    let mut next = plan.clone();
    next.planned_courses.retain(|_, planned| {
        let same_kind = is_off_grid(planned) == off_grid;
        let same_subject = planned.subject_code == course.subject_code;
        let same_term = !off_grid || planned.term == course.term;
        !(same_kind && same_subject && same_term)
    });
    next
}

fn placements<'a>(course: &'a Course, catalog: &'a [Course], semester: u32) -> Vec<(SlotKey, &'a Course)> {
    let mut entries: Vec<&Course> = Vec::new();
    if !is_off_grid(course) {
        entries.extend(catalog.iter().filter(|c| {
            c.subject_code == course.subject_code
                && c.term == course.term
                && is_eligible(&c.semester, semester)
        }));
    }
    if !entries.iter().any(|c| *c == course) {
        entries.insert(0, course);
    }

    let mut seen: BTreeMap<SlotKey, &Course> = BTreeMap::new();
    let mut out = Vec::new();
    for entry in entries {
        for slot in resolve_slots(entry) {
            if !seen.contains_key(&slot) {
                seen.insert(slot.clone(), entry);
                out.push((slot, entry));
            }
        }
    }
    out
}

fn counted_courses(plan: &Plan, semester: u32) -> BTreeMap<(&str, &str), &Course> {
    let mut unique = BTreeMap::new();
    for course in plan.planned_courses.values() {
        if course.subject_code.is_empty() || course.term.is_empty() {
            continue;
        }
        let counts = course
            .semester_number()
            .is_some_and(|required| f64::from(semester) >= required);
        if counts {
            unique.insert(course.plan_key(), course);
        }
    }
    unique
}

fn sum_credits(unique: &BTreeMap<(&str, &str), &Course>) -> u32 {
    unique.values().map(|c| c.credits).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::fixtures::course;

    fn plan_with(courses: &[Course], semester: u32) -> Plan {
        courses.iter().fold(Plan::named("Test"), |plan, c| {
            try_add(c, &plan, &[], semester).expect("setup add rejected")
        })
    }

    #[test]
    fn test_eligibility() {
        assert!(is_eligible("1", 1));
        assert!(is_eligible("1", 3));
        assert!(!is_eligible("3", 2));
        assert!(is_eligible("1のみ", 1));
        assert!(is_eligible("", 1));
        assert!(is_eligible(" 2 ", 2));
    }

    #[test]
    fn test_credit_limit_table() {
        assert_eq!(credit_limit(1), 18);
        assert_eq!(credit_limit(2), 18);
        assert_eq!(credit_limit(3), 20);
        assert_eq!(credit_limit(6), 20);
        assert_eq!(credit_limit(7), 24);
        assert_eq!(credit_limit(8), 24);
        assert_eq!(credit_limit(12), 24);
        assert_eq!(credit_limit(0), 24);
    }

    #[test]
    fn test_semester_course_fills_both_quarters_and_counts_once() {
        let a = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        let plan = try_add(&a, &Plan::named("Test"), &[], 1).expect("add rejected");

        assert_eq!(plan.get(&SlotKey::from("Mon-2-Q1")), Some(&a));
        assert_eq!(plan.get(&SlotKey::from("Mon-2-Q2")), Some(&a));
        assert_eq!(plan.planned_courses.len(), 2);
        assert_eq!(total_credits(&plan, 1), 2);
    }

    #[test]
    fn test_quarter_course_conflicts_with_semester_course() {
        let a = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        let b = course("XYZ67890", "Mon", 2, "1Q", 2, 1);
        let plan = plan_with(&[a], 1);

        let result = try_add(&b, &plan, &[], 1);
        match result {
            Err(Rejection::SlotConflict { conflicts }) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].slot, SlotKey::from("Mon-2-Q1"));
                assert_eq!(conflicts[0].subject_code, "ABC12345");
            }
            other => panic!("expected SlotConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_semester_course_rejected_when_one_quarter_is_taken() {
        let q2 = course("XYZ67890", "Mon", 2, "2Q", 2, 1);
        let sem = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        let plan = plan_with(&[q2], 1);

        let result = try_add(&sem, &plan, &[], 1);
        assert!(matches!(result, Err(Rejection::SlotConflict { .. })));
        // nothing was written into the free Q1 slot
        assert!(plan.get(&SlotKey::from("Mon-2-Q1")).is_none());
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let a = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        let plan = plan_with(&[a.clone()], 1);
        assert!(matches!(
            try_add(&a, &plan, &[], 1),
            Err(Rejection::AlreadyPlanned { .. })
        ));

        let s = course("SES00001", "", 0, "Session A", 2, 1);
        let plan = plan_with(&[s.clone()], 1);
        assert!(matches!(
            try_add(&s, &plan, &[], 1),
            Err(Rejection::AlreadyPlanned { .. })
        ));
    }

    #[test]
    fn test_credit_ceiling_boundary() {
        // 16 credits already planned for semester 1 (ceiling 18)
        let existing: Vec<Course> = (1..=8)
            .map(|i| course(&format!("BASE{:04}", i), "Tue", i as u8 % 6 + 1, if i <= 6 { "1Q" } else { "2Q" }, 2, 1))
            .collect();
        let plan = plan_with(&existing, 1);
        assert_eq!(total_credits(&plan, 1), 16);

        let heavy = course("LANG0001", "Fri", 1, "Semester", 4, 1);
        assert_eq!(
            try_add(&heavy, &plan, &[], 1),
            Err(Rejection::CreditLimitExceeded { total: 20, limit: 18 })
        );

        let light = course("LITE0001", "Fri", 1, "Semester", 2, 1);
        let next = try_add(&light, &plan, &[], 1).expect("2-credit course should fit");
        assert_eq!(total_credits(&next, 1), 18);
    }

    #[test]
    fn test_total_credits_ignores_later_and_marker_semesters() {
        let mut plan = Plan::named("Test");
        let early = course("EARLY001", "Mon", 1, "1Q", 2, 1);
        let later = course("LATER001", "Mon", 2, "1Q", 4, 3);
        let mut marker = course("MARK0001", "Mon", 3, "1Q", 2, 1);
        marker.semester = "1のみ".to_string();
        for c in [&early, &later, &marker] {
            for slot in resolve_slots(c) {
                plan.planned_courses.insert(slot, c.clone());
            }
        }

        assert_eq!(total_credits(&plan, 1), 2);
        assert_eq!(total_credits(&plan, 3), 6);
    }

    #[test]
    fn test_ineligible_course_is_rejected() {
        let c = course("ADV00001", "Wed", 3, "Semester", 2, 4);
        assert!(matches!(
            try_add(&c, &Plan::named("Test"), &[], 2),
            Err(Rejection::Ineligible { target: 2, .. })
        ));
    }

    #[test]
    fn test_unplaceable_is_checked_before_eligibility() {
        let c = course("ADV00002", "Wed", 3, "Intensive", 2, 4);
        assert!(matches!(
            try_add(&c, &Plan::named("Test"), &[], 2),
            Err(Rejection::Unplaceable { .. })
        ));
    }

    #[test]
    fn test_related_rows_are_placed_together() {
        let mon = course("TWICE001", "Mon", 3, "1Q", 2, 1);
        let thu = course("TWICE001", "Thu", 3, "1Q", 2, 1);
        let catalog = vec![mon.clone(), thu.clone()];

        let plan = try_add(&mon, &Plan::named("Test"), &catalog, 1).expect("add rejected");
        assert_eq!(plan.get(&SlotKey::from("Mon-3-Q1")), Some(&mon));
        assert_eq!(plan.get(&SlotKey::from("Thu-3-Q1")), Some(&thu));
        assert_eq!(total_credits(&plan, 1), 2);

        let blocker = course("BLOCK001", "Thu", 3, "1Q", 2, 1);
        let blocked = plan_with(&[blocker], 1);
        assert!(matches!(
            try_add(&mon, &blocked, &catalog, 1),
            Err(Rejection::SlotConflict { .. })
        ));
    }

    #[test]
    fn test_add_then_remove_round_trips() {
        let base = plan_with(&[course("KEEP0001", "Tue", 1, "2Q", 2, 1)], 1);
        for c in [
            course("ABC12345", "Mon", 2, "Semester", 2, 1),
            course("SES00001", "", 0, "Session B", 2, 1),
            {
                let mut od = course("ODM00001", "OnDemand", 0, "2Q", 2, 1);
                od.period = "OnDemand".to_string();
                od
            },
        ] {
            let added = try_add(&c, &base, &[], 1).expect("add rejected");
            assert_ne!(added, base);
            assert_eq!(remove(&c, &added), base);
        }

        // a session run of the same subject survives removal of the grid course
        let session = course("ABC12345", "", 0, "Session A", 2, 1);
        let base = plan_with(&[session.clone()], 1);
        let grid = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        let added = try_add(&grid, &base, &[], 1).expect("add rejected");
        assert_eq!(added.planned_courses.len(), 3);
        assert_eq!(remove(&grid, &added), base);
        assert_eq!(remove(&session, &added).planned_courses.len(), 2);
    }

    #[test]
    fn test_day_spellings_share_a_grid_cell() {
        let plan = plan_with(&[course("ABC12345", "Mon", 2, "1Q", 2, 1)], 1);
        for day in ["Monday", "mon", " MON "] {
            let other = course("XYZ67890", day, 2, "1Q", 2, 1);
            match try_add(&other, &plan, &[], 1) {
                Err(Rejection::SlotConflict { conflicts }) => {
                    assert_eq!(conflicts[0].slot, SlotKey::from("Mon-2-Q1"));
                }
                other => panic!("expected SlotConflict, got {:?}", other),
            }
        }

        let mut padded = course("XYZ67890", "Mon", 2, "Semester", 2, 1);
        padded.period = "02".to_string();
        assert!(matches!(
            try_add(&padded, &plan, &[], 1),
            Err(Rejection::SlotConflict { .. })
        ));
    }

    #[test]
    fn test_remove_missing_course_is_noop() {
        let base = plan_with(&[course("KEEP0001", "Tue", 1, "2Q", 2, 1)], 1);
        let other = course("GONE0001", "Mon", 1, "1Q", 2, 1);
        assert_eq!(remove(&other, &base), base);
    }

    #[test]
    fn test_remove_session_matches_term() {
        let a = course("SES00001", "", 0, "Session A", 2, 1);
        let b = course("SES00001", "", 0, "Session B", 2, 1);
        let plan = plan_with(&[a.clone(), b.clone()], 1);

        let next = remove(&a, &plan);
        assert_eq!(next.planned_courses.len(), 1);
        assert!(next.get(&SlotKey::session("SES00001", "Session B")).is_some());
    }

    #[test]
    fn test_credit_status() {
        let plan = plan_with(&[course("ABC12345", "Mon", 2, "Semester", 4, 1)], 1);
        let status = credit_status(&plan, 1);
        assert_eq!(status.total, 4);
        assert_eq!(status.limit, 18);
        assert!(!status.over_limit);
    }

    #[test]
    fn test_rejection_serializes_reason_and_detail() {
        let value = serde_json::to_value(Rejection::CreditLimitExceeded { total: 20, limit: 18 })
            .expect("serialize failed");
        assert_eq!(value["reason"], "credit_limit_exceeded");
        assert_eq!(value["detail"]["total"], 20);
    }
}
