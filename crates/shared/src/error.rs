use thiserror::Error;

/// User-visible failure of an analysis submission.
///
/// Index and probe failures never surface as errors (they degrade to an
/// empty or fallback state); submission is the one operation whose failure
/// the user must see.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The endpoint answered with a non-success status.
    #[error("analysis request rejected (HTTP {status})")]
    Rejected { status: u16 },
    /// The request never produced a usable response.
    #[error("analysis request failed: {0}")]
    Network(String),
}

impl SubmitError {
    /// Short tag for UI surfaces: the HTTP status when one exists,
    /// "network" otherwise.
    pub fn status_label(&self) -> String {
        match self {
            SubmitError::Rejected { status } => status.to_string(),
            SubmitError::Network(_) => "network".to_string(),
        }
    }
}
