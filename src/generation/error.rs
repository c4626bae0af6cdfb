use crate::firestore::FirestoreError;
use crate::functions::FunctionsError;
use thiserror::Error;

/// Local input problems caught before anything is sent to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("outputCount must be between 1 and 4, got {0}")]
    OutputCountOutOfRange(u8),
    #[error("too many files for {field}: at most {max} allowed")]
    TooManyFiles { field: &'static str, max: usize },
    #[error("unsupported file type for {0}")]
    UnsupportedMediaType(String),
    #[error("invalid phone number")]
    InvalidPhoneNumber,
}

impl ValidationError {
    /// The name of the field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::OutputCountOutOfRange(_) => "outputCount",
            ValidationError::TooManyFiles { field, .. } => field,
            ValidationError::UnsupportedMediaType(name) => name,
            ValidationError::InvalidPhoneNumber => "phoneNumber",
        }
    }
}

/// Errors surfaced by the generation flow.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// The account has no tokens left; the caller should route to billing.
    /// Carries the balance when the backend reported one.
    #[error("Insufficient balance")]
    InsufficientBalance { balance: Option<i64> },
    #[error("Brief generation failed: {0}")]
    BriefGenerationFailed(String),
    #[error("Submission failed: {0}")]
    Submission(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// The result subscription failed; the in-flight job is abandoned.
    #[error("Result listener failed: {0}")]
    Listener(String),
    #[error("Supplementary info submission failed: {0}")]
    SupplementaryInfoFailed(String),
    #[error("No job is in flight")]
    NoOutstandingJob,
    #[error("Functions error: {0}")]
    Functions(#[from] FunctionsError),
    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, GenerationError::InsufficientBalance { .. })
    }
}
