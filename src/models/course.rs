use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// One course offering as it appears in a college catalog file.
///
/// Catalog files are produced by the scraping scripts and are loose about
/// types: `period`, `semester` and `credits` show up as either numbers or
/// strings, so they are normalised on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, deserialize_with = "string_or_number")]
    pub subject_code: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub name_ja: String,
    #[serde(default)]
    pub instructor_en: String,
    #[serde(default)]
    pub instructor_ja: String,
    #[serde(default)]
    pub day: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub period: String,
    #[serde(default)]
    pub term: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub semester: String,
    #[serde(default, deserialize_with = "lenient_credits")]
    pub credits: u32,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub classroom: String,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllabus_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllabus_detail: Option<serde_json::Value>,
}

impl Course {
    /// Numeric minimum enrollment semester, if the catalog gives one.
    pub fn semester_number(&self) -> Option<f64> {
        parse_semester(&self.semester)
    }

    pub fn weekday(&self) -> Option<Weekday> {
        self.day.parse().ok()
    }

    pub fn period_number(&self) -> Option<u8> {
        self.period.trim().parse().ok()
    }

    /// `(subjectCode, term)` is what identifies a planned course for
    /// de-duplication.
    pub fn plan_key(&self) -> (&str, &str) {
        (&self.subject_code, &self.term)
    }
}

/// Parses a catalog semester value. Non-numeric markers such as `1のみ`
/// yield `None`.
pub fn parse_semester(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    /// Days shown on the timetable grid.
    pub const GRID: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(needle) || d.full_name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown day: {}", s))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
    Null(()),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
        StringOrNumber::Null(()) => String::new(),
    })
}

/// Credits are whole numbers in the planner. Fractional values are rounded
/// to the nearest credit (half away from zero); missing, negative or
/// non-numeric values count as zero.
fn lenient_credits<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = string_or_number(deserializer)?;
    Ok(raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n.round().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0))
}
