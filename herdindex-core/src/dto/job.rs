//! Job DTOs

use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobStatus};
use crate::domain::params::{EcoParams, MasterParams};

/// Request to create a job from its two parameter documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub name: String,
    pub master: MasterParams,
    pub eco: EcoParams,
}

/// One line of a job listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,
    pub status: JobStatus,
    pub comment: String,
    pub target_database: String,
    pub sale_endpoint: String,
    pub weights: usize,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            name: job.name.clone(),
            status: job.status,
            comment: job.comment.clone(),
            target_database: job.target_database.clone(),
            sale_endpoint: job.sale_endpoint.clone(),
            weights: job.output.len(),
        }
    }
}
