//! Business services behind the HTTP handlers.

pub mod workflow;

use std::time::Duration;

use pyro_db::DbError;
use pyro_pipeline::{CommandError, RenderError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("render timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("too many requests, please wait")]
    Throttled,

    #[error("{0}")]
    BadRequest(String),

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
