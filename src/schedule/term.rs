use serde::{Deserialize, Serialize};

use crate::models::Course;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
}

impl Quarter {
    pub const ALL: [Quarter; 2] = [Quarter::Q1, Quarter::Q2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "quarter")]
pub enum TermType {
    Semester,
    Quarter(Quarter),
    Session,
    Unknown,
}

/// Maps a free-text catalog term onto its scheduling category.
pub fn classify_term(term: Option<&str>) -> TermType {
    let Some(term) = term else {
        return TermType::Unknown;
    };
    let t = term.trim().to_lowercase();
    match t.as_str() {
        "semester" => TermType::Semester,
        "1q" | "q1" => TermType::Quarter(Quarter::Q1),
        "2q" | "q2" => TermType::Quarter(Quarter::Q2),
        _ if t.starts_with("session") => TermType::Session,
        _ => TermType::Unknown,
    }
}

pub fn is_on_demand(course: &Course) -> bool {
    [&course.period, &course.day, &course.term]
        .into_iter()
        .any(|value| contains_on_demand(value))
}

fn contains_on_demand(value: &str) -> bool {
    let squashed: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    squashed.contains("ondemand")
}
