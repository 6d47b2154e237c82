use thiserror::Error;

use crate::llm_client::{ProviderError, ProviderErrorKind};
use crate::models::student::OPINION_COUNT;

/// Every parser tier failed to produce exactly five opinions.
///
/// `raw` is kept for diagnostic logs only and is never part of `Display`.
#[derive(Debug, Clone, Error)]
#[error("provider response could not be parsed into {OPINION_COUNT} opinions")]
pub struct ParseError {
    pub raw: String,
}

#[derive(Debug, Clone, Error)]
pub enum OpinionError {
    #[error("no generative model is available")]
    ModelUnavailable,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Terminal failure category, recorded on a failed generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ModelUnavailable,
    Provider(ProviderErrorKind),
    Parse,
}

impl OpinionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            OpinionError::ModelUnavailable => FailureKind::ModelUnavailable,
            OpinionError::Provider(e) => FailureKind::Provider(e.kind),
            OpinionError::Parse(_) => FailureKind::Parse,
        }
    }
}
