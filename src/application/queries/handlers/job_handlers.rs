//! Auto-Complete Job Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::JobRepositoryPort;
use crate::application::queries::{GetJobStatusQuery, JobSnapshot, ListJobsQuery};

/// GetJobStatus Handler
///
/// 仅任务 owner 可读，包含完整评分历史
pub struct GetJobStatusHandler {
    job_repo: Arc<dyn JobRepositoryPort>,
}

impl GetJobStatusHandler {
    pub fn new(job_repo: Arc<dyn JobRepositoryPort>) -> Self {
        Self { job_repo }
    }

    pub async fn handle(&self, query: GetJobStatusQuery) -> Result<JobSnapshot, ApplicationError> {
        let job = self
            .job_repo
            .find_by_id(query.job_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Job", query.job_id))?;

        if job.owner_id != query.user_id {
            return Err(ApplicationError::forbidden(format!(
                "user {} is not the owner of job {}",
                query.user_id, query.job_id
            )));
        }

        let scores = self.job_repo.scores(query.job_id).await?;
        Ok(JobSnapshot::from_record(&job, &scores))
    }
}

/// ListJobs Handler
pub struct ListJobsHandler {
    job_repo: Arc<dyn JobRepositoryPort>,
}

impl ListJobsHandler {
    pub fn new(job_repo: Arc<dyn JobRepositoryPort>) -> Self {
        Self { job_repo }
    }

    pub async fn handle(&self, query: ListJobsQuery) -> Result<Vec<JobSnapshot>, ApplicationError> {
        let jobs = self.job_repo.find_by_owner(&query.user_id).await?;
        Ok(jobs
            .iter()
            .map(|job| JobSnapshot::from_record(job, &[]))
            .collect())
    }
}
