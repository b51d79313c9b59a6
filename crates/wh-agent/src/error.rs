use thiserror::Error;

use wh_core::AgentId;
use wh_plan::PlanError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("agent {0} already exists")]
    DuplicateAgent(AgentId),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub type AgentResult<T> = Result<T, AgentError>;
