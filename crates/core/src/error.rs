//! Shared error taxonomy. Every crate in the workspace maps its stage-local
//! failures onto this enum's variants so that callers (the CLI, the server,
//! the pipeline runner) can make one consistent decision about exit codes,
//! retries, and batch-item-failure reporting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdpError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("config missing: {0}")]
    ConfigMissing(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("copy verification failed for {0}")]
    CopyVerificationFailed(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("embedding failed: {0}")]
    EmbedFailed(String),

    #[error("rerank failed: {0}")]
    RerankFailed(String),

    #[error("LLM call failed: {0}")]
    LlmFailed(String),

    #[error("PII detection failed: {0}")]
    PiiDetectionFailed(String),

    #[error("redaction failed: {0}")]
    RedactionFailed(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IdpError {
    /// HTTP-equivalent status code per §7 of the design.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InputInvalid(_) => 400,
            Self::ConfigMissing(_) => 500,
            Self::NotFound(_) => 404,
            Self::CopyVerificationFailed(_) => 500,
            Self::BackendUnavailable(_) => 502,
            Self::ParseError(_) => 422,
            Self::OcrFailed(_) | Self::EmbedFailed(_) | Self::RerankFailed(_) | Self::LlmFailed(_) => 502,
            Self::PiiDetectionFailed(_) => 502,
            Self::RedactionFailed(_) => 500,
            Self::Timeout(_) => 504,
            Self::Other(_) => 500,
        }
    }

    /// CLI exit code: 1 for any unrecovered error (2 is reserved for clap's
    /// own bad-invocation exit, never produced here).
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Short, internal-identifier-free message suitable for a user-visible
    /// error body.
    pub fn public_message(&self) -> String {
        match self {
            Self::InputInvalid(_) => "invalid input".to_string(),
            Self::ConfigMissing(_) => "server misconfigured".to_string(),
            Self::NotFound(_) => "not found".to_string(),
            Self::CopyVerificationFailed(_) => "copy verification failed".to_string(),
            Self::BackendUnavailable(_) => "upstream backend unavailable".to_string(),
            Self::ParseError(_) => "could not parse document".to_string(),
            Self::OcrFailed(_) => "OCR failed".to_string(),
            Self::EmbedFailed(_) => "embedding failed".to_string(),
            Self::RerankFailed(_) => "rerank failed".to_string(),
            Self::LlmFailed(_) => "LLM call failed".to_string(),
            Self::PiiDetectionFailed(_) => "PII detection failed".to_string(),
            Self::RedactionFailed(_) => "redaction failed".to_string(),
            Self::Timeout(_) => "request timed out".to_string(),
            Self::Other(_) => "internal error".to_string(),
        }
    }
}

impl From<crate::work_queue::WorkQueueError> for IdpError {
    fn from(err: crate::work_queue::WorkQueueError) -> Self {
        IdpError::BackendUnavailable(err.to_string())
    }
}

impl From<crate::work_queue::PipelineError> for IdpError {
    fn from(err: crate::work_queue::PipelineError) -> Self {
        match err {
            crate::work_queue::PipelineError::WorkQueue(e) => e.into(),
            crate::work_queue::PipelineError::Other(e) => IdpError::Other(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, IdpError>;
