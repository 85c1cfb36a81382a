//! Spreadsheet export of a single plan.

use std::fmt::Write;

use crate::models::{Course, Plan, SlotKey, Weekday};
use crate::schedule::{Quarter, is_on_demand};

pub const PERIODS: [u8; 6] = [1, 2, 3, 4, 5, 6];

/// Rows of the timetable sheet: a day header, one row per period and
/// quarter, then the session and on-demand sections when present.
pub fn timetable_rows(plan: &Plan) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    let mut header = vec![String::new()];
    header.extend(Weekday::GRID.iter().map(|d| d.full_name().to_string()));
    rows.push(header);

    for period in PERIODS {
        for quarter in Quarter::ALL {
            let mut row = vec![format!("{} {}", quarter.as_str(), period)];
            for day in Weekday::GRID {
                let key = SlotKey::grid(day, period, quarter.as_str());
                row.push(plan.get(&key).map(|c| c.name_en.clone()).unwrap_or_default());
            }
            rows.push(row);
        }
    }

    let unique = plan.unique_courses();
    let sessions: Vec<&Course> = plan
        .planned_courses
        .iter()
        .filter(|(key, _)| key.is_session())
        .map(|(_, c)| c)
        .collect();
    let on_demand: Vec<&Course> = unique.iter().copied().filter(|c| is_on_demand(c)).collect();

    push_section(&mut rows, "Session Classes", &sessions);
    push_section(&mut rows, "On-Demand Classes", &on_demand);
    rows
}

pub fn to_csv(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|cell| escape(cell)).collect();
        let _ = writeln!(out, "{}", line.join(","));
    }
    out
}

pub fn file_name(plan: &Plan) -> String {
    let name: Vec<&str> = plan.name.split_whitespace().collect();
    format!("{}_timetable.csv", name.join("_"))
}

fn push_section(rows: &mut Vec<Vec<String>>, title: &str, courses: &[&Course]) {
    if courses.is_empty() {
        return;
    }
    rows.push(Vec::new());
    rows.push(vec![title.to_string()]);
    rows.extend(courses.iter().map(|c| vec![c.name_en.clone()]));
}

fn escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::fixtures::course;
    use crate::schedule::try_add;

    #[test]
    fn test_grid_rows_and_sections() {
        let mut sem = course("ABC12345", "Mon", 2, "Semester", 2, 1);
        sem.name_en = "Macroeconomics, Intro".to_string();
        let session = course("SES00001", "", 0, "Session A", 2, 1);

        let plan = try_add(&sem, &Plan::named("Main Plan"), &[], 1).expect("add failed");
        let plan = try_add(&session, &plan, &[], 1).expect("add failed");

        let rows = timetable_rows(&plan);
        assert_eq!(rows[0], vec!["", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]);
        // header + 6 periods x 2 quarters, then blank, title, one session
        assert_eq!(rows.len(), 1 + 12 + 3);
        assert_eq!(rows[3][0], "Q1 2");
        assert_eq!(rows[3][1], "Macroeconomics, Intro");
        assert_eq!(rows[4][1], "Macroeconomics, Intro");
        assert_eq!(rows[14], vec!["Session Classes"]);

        let csv = to_csv(&rows);
        assert!(csv.contains("Q1 2,\"Macroeconomics, Intro\",,,,"));
    }

    #[test]
    fn test_file_name_replaces_whitespace() {
        assert_eq!(file_name(&Plan::named("Main  Plan 2")), "Main_Plan_2_timetable.csv");
    }
}
