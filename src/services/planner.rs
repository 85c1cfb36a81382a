use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Course, PlanId, PlanSet};
use crate::schedule::{self, CreditStatus};
use crate::store::BlobStore;

pub const STORAGE_KEY: &str = "timetables";

/// Owns the plan set and runs every change as read, validate, write,
/// persist.
///
/// Persistence is last-write-wins: a failed write is logged and the
/// in-memory state is kept.
pub struct PlannerService {
    store: Arc<dyn BlobStore>,
    plans: Mutex<PlanSet>,
}

impl PlannerService {
    pub async fn open(store: Arc<dyn BlobStore>) -> Result<Self, AppError> {
        let plans = match restore(store.as_ref()).await? {
            Some(plans) => {
                info!("Restored {} plan(s) from storage", plans.len());
                plans
            }
            None => {
                info!("No saved plans found, starting with a default plan");
                let plans = PlanSet::default();
                persist(store.as_ref(), &plans).await;
                plans
            }
        };

        Ok(Self {
            store,
            plans: Mutex::new(plans),
        })
    }

    pub async fn snapshot(&self) -> PlanSet {
        self.plans.lock().await.clone()
    }

    pub async fn credits(&self, semester: u32) -> CreditStatus {
        let plans = self.plans.lock().await;
        schedule::credit_status(plans.current(), semester)
    }

    pub async fn add_course(&self, course: &Course, catalog: &[Course], semester: u32) -> Result<PlanSet, AppError> {
        self.update(|plans| {
            let plan = schedule::try_add(course, plans.current(), catalog, semester)?;
            info!("Added {} ({}) to {}", course.subject_code, course.term, plans.current().name);
            Ok(plans.with_current(plan))
        })
        .await
    }

    pub async fn remove_course(&self, course: &Course) -> Result<PlanSet, AppError> {
        self.update(|plans| {
            let plan = schedule::remove(course, plans.current());
            Ok(plans.with_current(plan))
        })
        .await
    }

    pub async fn create_plan(&self, copy: bool) -> Result<PlanSet, AppError> {
        self.update(|plans| {
            Ok(if copy {
                plans.duplicate_plan()
            } else {
                plans.create_plan()
            })
        })
        .await
    }

    pub async fn rename_plan(&self, name: &str) -> Result<PlanSet, AppError> {
        self.update(|plans| Ok(plans.rename_plan(name)?)).await
    }

    pub async fn delete_plan(&self) -> Result<PlanSet, AppError> {
        self.update(|plans| Ok(plans.delete_plan()?)).await
    }

    pub async fn select_plan(&self, id: &PlanId) -> Result<PlanSet, AppError> {
        self.update(|plans| Ok(plans.select_plan(id)?)).await
    }

    pub async fn clear_plan(&self) -> Result<PlanSet, AppError> {
        self.update(|plans| Ok(plans.clear_current())).await
    }

    /// Clears the storage entry and starts over with a single empty plan.
    pub async fn reset(&self) -> Result<PlanSet, AppError> {
        let mut plans = self.plans.lock().await;
        self.store.clear(STORAGE_KEY).await?;
        *plans = PlanSet::default();
        persist(self.store.as_ref(), &plans).await;
        warn!("All plans were reset");
        Ok(plans.clone())
    }

    async fn update<F>(&self, f: F) -> Result<PlanSet, AppError>
    where
        F: FnOnce(&PlanSet) -> Result<PlanSet, AppError>,
    {
        let mut plans = self.plans.lock().await;
        let next = f(&*plans)?;
        *plans = next;
        persist(self.store.as_ref(), &plans).await;
        Ok(plans.clone())
    }
}

async fn restore(store: &dyn BlobStore) -> Result<Option<PlanSet>, AppError> {
    let Some(raw) = store.get(STORAGE_KEY).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<PlanSet>(&raw) {
        Ok(plans) => {
            let restored = plans.into_valid();
            if restored.is_none() {
                warn!("Saved plans were empty, ignoring them");
            }
            Ok(restored)
        }
        Err(e) => {
            warn!("Saved plans could not be parsed, ignoring them: {}", e);
            Ok(None)
        }
    }
}

async fn persist(store: &dyn BlobStore, plans: &PlanSet) {
    let raw = match serde_json::to_string(plans) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to serialize plans: {}", e);
            return;
        }
    };
    if let Err(e) = store.put(STORAGE_KEY, &raw).await {
        warn!("Failed to persist plans: {}", e);
    }
}
