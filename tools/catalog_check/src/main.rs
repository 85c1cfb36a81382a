use dotenvy::dotenv;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const COLLEGES: [&str; 3] = ["apm", "aps", "st"];
const DEFAULT_SYLLABUS_URL: &str = "https://syllabus.apu.ac.jp/syllabus/search/getSyllabusDetail";

fn is_dry_run() -> bool {
    !std::env::args().any(|a| a == "--apply")
}

fn wants_fetch() -> bool {
    std::env::args().any(|a| a == "--fetch-syllabus")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseRow {
    #[serde(default)]
    subject_code: Option<Value>,
    #[serde(default)]
    name_en: Option<String>,
    #[serde(default)]
    term: Option<String>,
    #[serde(default)]
    syllabus_detail: Option<Value>,
}

impl CourseRow {
    fn code(&self) -> Option<String> {
        match &self.subject_code {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Report {
    total: usize,
    duplicates: usize,
    missing_fields: usize,
    missing_syllabus: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let dir = PathBuf::from(env::var("CATALOG_DIR").unwrap_or_else(|_| "data".to_string()));
    let syllabus_url = env::var("SYLLABUS_URL").unwrap_or_else(|_| DEFAULT_SYLLABUS_URL.to_string());
    let concurrency = env::var("FETCH_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(8);

    let dry_run = is_dry_run();
    let client = Client::new();

    for college in COLLEGES {
        let path = dir.join(format!("{}_clean_with_syllabus.json", college));
        let mut rows = match read_rows(&path).await {
            Ok(rows) => rows,
            Err(e) => {
                println!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let report = check_rows(&rows);
        println!("\n{}:", path.display());
        println!("  Courses: {}", report.total);
        println!("  Duplicates (subjectCode|term): {}", report.duplicates);
        println!("  Missing required fields: {}", report.missing_fields);
        println!("  Missing syllabusDetail: {}", report.missing_syllabus);

        if !wants_fetch() || report.missing_syllabus == 0 {
            continue;
        }

        let pending = missing_syllabus_codes(&rows);
        if dry_run {
            for code in &pending {
                println!("[DRY RUN] Would fetch syllabus for {}", code);
            }
            continue;
        }

        let fetched = fetch_all(&client, &syllabus_url, pending, concurrency).await;
        let mut filled = 0;
        let mut failed = 0;
        for (code, result) in fetched {
            match result {
                Ok(detail) => {
                    for row in rows.iter_mut().filter(|r| row_code(r).as_deref() == Some(code.as_str())) {
                        if let Some(obj) = row.as_object_mut() {
                            obj.insert("syllabusDetail".to_string(), detail.clone());
                        }
                    }
                    filled += 1;
                }
                Err(e) => {
                    println!("  Failed to fetch {}: {}", code, e);
                    failed += 1;
                }
            }
        }

        tokio::fs::write(&path, serde_json::to_string_pretty(&rows)?).await?;
        println!("  Syllabus filled: {} (failed: {})", filled, failed);
    }

    Ok(())
}

async fn read_rows(path: &Path) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let body = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&body)?)
}

fn row_code(row: &Value) -> Option<String> {
    serde_json::from_value::<CourseRow>(row.clone()).ok()?.code()
}

fn check_rows(rows: &[Value]) -> Report {
    let mut report = Report::default();
    let mut seen = HashSet::new();

    for row in rows {
        let course: CourseRow = serde_json::from_value(row.clone()).unwrap_or_default();
        report.total += 1;

        let code = course.code();
        let term = course.term.clone().unwrap_or_default();
        let key = format!("{}|{}", code.clone().unwrap_or_default(), term);
        if !seen.insert(key) {
            report.duplicates += 1;
        }

        let has_name = course.name_en.as_deref().is_some_and(|n| !n.trim().is_empty());
        if code.is_none() || !has_name || term.trim().is_empty() {
            report.missing_fields += 1;
        }

        if course.syllabus_detail.as_ref().is_none_or(|d| d.is_null()) {
            report.missing_syllabus += 1;
        }
    }

    report
}

fn missing_syllabus_codes(rows: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| serde_json::from_value::<CourseRow>(row.clone()).ok())
        .filter(|c| c.syllabus_detail.as_ref().is_none_or(|d| d.is_null()))
        .filter_map(|c| c.code())
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

/// Fetches syllabus pages with at most `concurrency` requests in flight.
/// Every job reports its own result so one failure never stops the batch.
async fn fetch_all(
    client: &Client,
    base_url: &str,
    codes: Vec<String>,
    concurrency: usize,
) -> Vec<(String, Result<Value, String>)> {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut jobs = JoinSet::new();

    for code in codes {
        let client = client.clone();
        let url = base_url.to_string();
        let permits = permits.clone();
        jobs.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => fetch_syllabus(&client, &url, &code).await,
                Err(e) => Err(e.to_string()),
            };
            (code, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => println!("  Fetch job panicked: {}", e),
        }
    }
    results
}

async fn fetch_syllabus(client: &Client, base_url: &str, subject_code: &str) -> Result<Value, String> {
    let res = client
        .get(base_url)
        .query(&[("subjectCode", subject_code)])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    res.json::<Value>().await.map_err(|e| e.to_string())
}
