use std::fmt::{Display, Formatter};

use thiserror::Error as ThisError;

use crate::solve::SolveState;

/// Coarse outcome class of a failed solve.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolveStatus {
    /// Point count out of bounds. The only caller-correctable failure.
    MalformedInput,
    Error,
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedInput => f.write_str("MALFORMED_INPUT"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("{0}")]
    Collaborator(String),
    #[error("{stage} failed: {source}")]
    Stage {
        stage: SolveState,
        source: Box<Error>,
    },
    #[error("operational memory exhausted: requested {requested} bytes, {available} available")]
    OpMemExhausted { requested: usize, available: usize },
    #[error("buffer capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
    #[error(transparent)]
    Tsplib(#[from] tsplib::TsplibError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// Failure reported by a collaborator kernel.
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }

    pub fn stage(stage: SolveState, source: Error) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn status(&self) -> SolveStatus {
        match self {
            Self::MalformedInput(_) => SolveStatus::MalformedInput,
            _ => SolveStatus::Error,
        }
    }
}
