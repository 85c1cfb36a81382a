pub mod source;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Course, Weekday};
use crate::schedule::{Quarter, TermType, classify_term, is_eligible, is_on_demand};

pub use source::{CatalogSource, FileCatalogSource, HttpCatalogSource, StaticCatalogSource};

pub const COLLEGES: [College; 3] = [
    College { id: "apm", name: "APM" },
    College { id: "aps", name: "APS" },
    College { id: "st", name: "ST" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct College {
    pub id: &'static str,
    pub name: &'static str,
}

pub fn find_college(id: &str) -> Option<College> {
    COLLEGES.into_iter().find(|c| c.id.eq_ignore_ascii_case(id.trim()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TermFilter {
    #[default]
    All,
    Semester,
    Quarter,
    Session,
    OnDemand,
}

impl TermFilter {
    fn matches(&self, course: &Course) -> bool {
        let term_type = classify_term(Some(course.term.as_str()));
        match self {
            TermFilter::All => true,
            TermFilter::Semester => term_type == TermType::Semester,
            TermFilter::Quarter => matches!(term_type, TermType::Quarter(_)),
            TermFilter::Session => term_type == TermType::Session,
            TermFilter::OnDemand => is_on_demand(course),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub term: TermFilter,
    pub fields: Vec<String>,
    pub search: Option<String>,
    pub semester: Option<u32>,
}

/// Course offerings of one college. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Catalog {
    college: College,
    courses: Vec<Course>,
}

impl Catalog {
    pub fn new(college: College, courses: Vec<Course>) -> Self {
        Self { college, courses }
    }

    pub fn college(&self) -> College {
        self.college
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Looks a course up by code and term; day and period narrow the match
    /// when a course meets more than once a week.
    pub fn find(&self, subject_code: &str, term: &str, day: Option<&str>, period: Option<&str>) -> Option<&Course> {
        let day = day.map(|d| (d.trim(), d.parse::<Weekday>().ok()));
        let period = period.map(|p| (p.trim(), p.trim().parse::<u8>().ok()));
        self.courses.iter().find(|c| {
            c.subject_code == subject_code
                && c.term == term
                && day.is_none_or(|(raw, parsed)| match (parsed, c.weekday()) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => c.day.trim().eq_ignore_ascii_case(raw),
                })
                && period.is_none_or(|(raw, parsed)| match (parsed, c.period_number()) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => c.period.trim() == raw,
                })
        })
    }

    /// Distinct, non-empty field labels in catalog order.
    pub fn fields(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.courses
            .iter()
            .map(|c| c.field.as_str())
            .filter(|f| !f.is_empty() && seen.insert(*f))
            .collect()
    }

    pub fn filter(&self, filter: &CourseFilter) -> Vec<&Course> {
        let search = filter.search.as_ref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        self.courses
            .iter()
            .filter(|c| filter.term.matches(c))
            .filter(|c| filter.fields.is_empty() || filter.fields.iter().any(|f| *f == c.field))
            .filter(|c| filter.semester.is_none_or(|s| is_eligible(&c.semester, s)))
            .filter(|c| {
                search.as_ref().is_none_or(|needle| {
                    [&c.subject_code, &c.name_en, &c.name_ja, &c.instructor_en, &c.instructor_ja]
                        .iter()
                        .any(|v| v.to_lowercase().contains(needle.as_str()))
                })
            })
            .collect()
    }

    /// Candidates for an empty grid cell: same day and period, eligible for
    /// the semester, and either semester-long or taught in that quarter.
    pub fn for_cell(&self, day: Weekday, period: u8, quarter: Quarter, semester: u32) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| c.weekday() == Some(day) && c.period_number() == Some(period))
            .filter(|c| is_eligible(&c.semester, semester))
            .filter(|c| match classify_term(Some(c.term.as_str())) {
                TermType::Semester => true,
                TermType::Quarter(q) => q == quarter,
                _ => false,
            })
            .collect()
    }

    pub fn sessions(&self, semester: u32) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| classify_term(Some(c.term.as_str())) == TermType::Session)
            .filter(|c| is_eligible(&c.semester, semester))
            .collect()
    }

    pub fn on_demand(&self, semester: u32) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| is_on_demand(c))
            .filter(|c| is_eligible(&c.semester, semester))
            .collect()
    }
}

#[derive(Default)]
struct CacheSlot {
    generation: u64,
    selected: Option<College>,
    catalog: Option<Arc<Catalog>>,
}

/// Holds the catalog of the currently selected college.
///
/// Selecting a college bumps a generation counter before loading. A load
/// that completes after a newer selection is dropped and reported as a
/// conflict, so the latest selection always wins.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    slot: RwLock<CacheSlot>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            slot: RwLock::new(CacheSlot::default()),
        }
    }

    pub async fn select(&self, college: College) -> Result<Arc<Catalog>, AppError> {
        let generation = {
            let mut slot = self.slot.write().await;
            slot.generation += 1;
            slot.selected = Some(college);
            slot.generation
        };

        info!("Loading catalog for {}", college.name);
        let courses = self.source.fetch_courses(college.id).await?;
        let catalog = Arc::new(Catalog::new(college, courses));

        let mut slot = self.slot.write().await;
        if slot.generation != generation {
            warn!("Discarding stale catalog load for {}", college.name);
            let latest = slot.selected.map(|c| c.name).unwrap_or("another college");
            return Err(AppError::Conflict(format!(
                "selection of {} was superseded by {}",
                college.name, latest
            )));
        }

        info!("Catalog for {} loaded ({} courses)", college.name, catalog.courses().len());
        slot.catalog = Some(catalog.clone());
        Ok(catalog)
    }

    /// The loaded catalog, only if it belongs to the latest selection.
    pub async fn current(&self) -> Option<Arc<Catalog>> {
        let slot = self.slot.read().await;
        match (&slot.catalog, slot.selected) {
            (Some(catalog), Some(selected)) if catalog.college() == selected => Some(catalog.clone()),
            _ => None,
        }
    }

    pub async fn require_current(&self) -> Result<Arc<Catalog>, AppError> {
        self.current()
            .await
            .ok_or_else(|| AppError::BadRequest("no college catalog is loaded; select a college first".to_string()))
    }
}
