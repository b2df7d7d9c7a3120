use thiserror::Error;

use crate::core::types::{AgentId, CellId, SourceId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColonyError {
    /// The chosen cell or source is no longer eligible for the step being executed.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Capacity exceeded on cell {cell:?}: requested {requested}, room for {available}")]
    CapacityExceeded {
        cell: CellId,
        requested: u32,
        available: u32,
    },

    #[error("Cell {0:?} is already claimed")]
    LockConflict(CellId),

    #[error("Source {0:?} is already claimed")]
    SourceBusy(SourceId),

    #[error("Agent {0:?} has run out of energy")]
    AgentExpired(AgentId),

    #[error("Agent not found: {0:?}")]
    AgentNotFound(AgentId),

    #[error("Cell not found: {0:?}")]
    CellNotFound(CellId),

    #[error("Source not found: {0:?}")]
    SourceNotFound(SourceId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ColonyError {
    fn from(err: serde_json::Error) -> Self {
        ColonyError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ColonyError>;
