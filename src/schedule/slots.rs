use crate::models::{Course, SlotKey};

use super::term::{Quarter, TermType, classify_term, is_on_demand};

/// Slots a course would occupy if placed, in quarter order.
///
/// On-demand courses are checked before the term type: they have no
/// physical day/period, so a grid key would be meaningless for them. Grid
/// keys are built from the parsed day and period, so `Mon`, `monday` and
/// `02` land on the same cell as `Mon` and `2`. An empty result means the
/// course cannot be placed.
pub fn resolve_slots(course: &Course) -> Vec<SlotKey> {
    if is_on_demand(course) {
        return vec![SlotKey::on_demand(&course.subject_code, &course.term)];
    }

    let quarters: &[Quarter] = match classify_term(Some(course.term.as_str())) {
        TermType::Semester => &Quarter::ALL,
        TermType::Quarter(Quarter::Q1) => &[Quarter::Q1],
        TermType::Quarter(Quarter::Q2) => &[Quarter::Q2],
        TermType::Session => return vec![SlotKey::session(&course.subject_code, &course.term)],
        TermType::Unknown => return Vec::new(),
    };

    let (Some(day), Some(period)) = (course.weekday(), course.period_number()) else {
        return Vec::new();
    };
    quarters.iter().map(|q| SlotKey::grid(day, period, q.as_str())).collect()
}

/// Session and on-demand courses live in pseudo slots outside the grid.
pub fn is_off_grid(course: &Course) -> bool {
    is_on_demand(course) || classify_term(Some(course.term.as_str())) == TermType::Session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::fixtures::course;

    #[test]
    fn test_semester_course_takes_both_quarters() {
        let c = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        let slots = resolve_slots(&c);
        assert_eq!(slots, vec![SlotKey::from("Mon-2-Q1"), SlotKey::from("Mon-2-Q2")]);
    }

    #[test]
    fn test_quarter_course_takes_its_quarter() {
        let c = course("DEF00001", "Thu", 5, "2Q", 2, 1);
        assert_eq!(resolve_slots(&c), vec![SlotKey::from("Thu-5-Q2")]);
    }

    #[test]
    fn test_session_course_uses_pseudo_slot() {
        let c = course("SES00001", "", 0, "Session A", 2, 1);
        let slots = resolve_slots(&c);
        assert_eq!(slots, vec![SlotKey::from("Session|SES00001|Session A")]);
        assert!(slots[0].is_session());
        assert!(is_off_grid(&c));
    }

    #[test]
    fn test_on_demand_wins_over_term_type() {
        let mut c = course("ODM00001", "OnDemand", 1, "Semester", 2, 1);
        c.period = "OnDemand".to_string();
        let slots = resolve_slots(&c);
        assert_eq!(slots, vec![SlotKey::from("OnDemand|ODM00001|Semester")]);
        assert!(slots[0].is_on_demand());
    }

    #[test]
    fn test_grid_keys_normalise_day_and_period() {
        let mut c = course("ABC12345", "monday", 2, "1Q", 2, 1);
        c.period = " 02 ".to_string();
        assert_eq!(resolve_slots(&c), vec![SlotKey::from("Mon-2-Q1")]);

        c.day = "MON".to_string();
        assert_eq!(resolve_slots(&c), vec![SlotKey::from("Mon-2-Q1")]);
    }

    #[test]
    fn test_unparseable_day_or_period_is_unplaceable() {
        let c = course("ABC12345", "Someday", 2, "Semester", 2, 1);
        assert!(resolve_slots(&c).is_empty());

        let mut c = course("ABC12345", "Mon", 2, "1Q", 2, 1);
        c.period = "TBA".to_string();
        assert!(resolve_slots(&c).is_empty());
    }

    #[test]
    fn test_unknown_term_is_unplaceable() {
        let c = course("UNK00001", "Mon", 1, "Intensive", 2, 1);
        assert!(resolve_slots(&c).is_empty());
        assert!(!is_off_grid(&c));
    }
}
