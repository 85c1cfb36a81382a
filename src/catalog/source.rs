use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;
use crate::models::Course;

pub fn catalog_file_name(college: &str) -> String {
    format!("{}_clean_with_syllabus.json", college)
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_courses(&self, college: &str) -> Result<Vec<Course>, AppError>;
}

/// Reads catalog files from a local data directory.
pub struct FileCatalogSource {
    dir: PathBuf,
}

impl FileCatalogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch_courses(&self, college: &str) -> Result<Vec<Course>, AppError> {
        let path = self.dir.join(catalog_file_name(college));
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Catalog(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str::<Vec<Course>>(&body).map_err(|e| {
            tracing::error!("Failed to parse {}: {}", path.display(), e);
            AppError::Catalog(format!("Failed to parse catalog for {}: {}", college, e))
        })
    }
}

/// Fetches catalog files from a static file host.
pub struct HttpCatalogSource {
    client: Client,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Catalog(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_courses(&self, college: &str) -> Result<Vec<Course>, AppError> {
        let url = format!("{}/{}", self.base_url, catalog_file_name(college));

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Catalog(format!("Catalog request {} failed: {}", url, status)));
        }

        response
            .json::<Vec<Course>>()
            .await
            .map_err(|e| AppError::Catalog(format!("Failed to parse catalog for {}: {}", college, e)))
    }
}

/// In-memory catalogs, keyed by college.
#[derive(Default)]
pub struct StaticCatalogSource {
    catalogs: HashMap<String, Vec<Course>>,
}

impl StaticCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_college(mut self, college: &str, courses: Vec<Course>) -> Self {
        self.catalogs.insert(college.to_string(), courses);
        self
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_courses(&self, college: &str) -> Result<Vec<Course>, AppError> {
        self.catalogs
            .get(college)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no catalog for college {}", college)))
    }
}
