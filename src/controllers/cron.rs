use axum::{
    extract::{
        rejection::QueryRejection,
        Query, State,
    },
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    domain::jobs::{CronQuery, CronResponse, JobKind, JobsServiceApi},
    error::{AppError, AppResult},
};

pub struct CronController {
    jobs_service: Arc<dyn JobsServiceApi>,
}

impl CronController {
    pub fn new(jobs_service: Arc<dyn JobsServiceApi>) -> Self {
        Self { jobs_service }
    }

    /// POST /api/cron/subscriptions?job= - Scheduler entry point, secret-gated
    pub async fn run(
        State(controller): State<Arc<CronController>>,
        query: Result<Query<CronQuery>, QueryRejection>,
    ) -> AppResult<Json<CronResponse>> {
        let Query(query) = query?;
        let job: JobKind = query
            .job
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(AppError::BadRequest)?;

        let ran_at = Utc::now();
        let results = controller.jobs_service.run(job, ran_at).await?;

        Ok(Json(CronResponse {
            success: true,
            job: job.as_str().to_string(),
            ran_at,
            results,
        }))
    }
}
