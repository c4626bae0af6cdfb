use super::backend::{
    GenerateRequest, GenerateResponse, GenerationBackend, INSUFFICIENT_TOKENS_REASON,
};
use super::error::GenerationError;
use super::types::{GenerationRequest, GenerationSettings, JobHandle};

/// A job accepted by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub handle: JobHandle,
    /// Balance reported alongside the job, if any. Advisory only.
    pub balance: Option<i64>,
}

/// Sends generation requests to the backend. Performs no retries of its own.
pub struct JobSubmitter<'a> {
    backend: &'a dyn GenerationBackend,
    tenant_id: &'a str,
}

impl<'a> JobSubmitter<'a> {
    pub fn new(backend: &'a dyn GenerationBackend, tenant_id: &'a str) -> Self {
        Self { backend, tenant_id }
    }

    /// Submits `request` and returns the job handle.
    ///
    /// The request is validated first; an invalid request never reaches the backend.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Submission, GenerationError> {
        request.validate()?;

        let kind = request.kind();
        let payload = self.payload(request);
        tracing::info!(
            tenant_id = self.tenant_id,
            %kind,
            output_count = payload.output_count,
            size = %payload.size,
            "Submitting generation job"
        );

        let response = self
            .backend
            .generate(&payload)
            .await
            .map_err(|e| GenerationError::Submission(e.to_string()))?;

        interpret(response)
    }

    fn payload(&self, request: GenerationRequest) -> GenerateRequest {
        let GenerationRequest {
            prompt,
            settings,
            attachments,
            inspiration,
        } = request;
        let kind = settings.kind();

        match settings {
            GenerationSettings::Image(s) => GenerateRequest {
                attachments,
                inspiration,
                prompt,
                tenant_id: self.tenant_id.to_string(),
                output_count: s.output_count,
                size: s.aspect_ratio,
                kind,
                language: Some(s.language_code),
                include_text: Some(s.include_text),
                model_tier: None,
            },
            GenerationSettings::Video(s) => GenerateRequest {
                attachments,
                inspiration,
                prompt,
                tenant_id: self.tenant_id.to_string(),
                output_count: s.output_count,
                size: s.aspect_ratio,
                kind,
                language: None,
                include_text: None,
                model_tier: Some(s.model_tier),
            },
        }
    }
}

/// Converts the untyped submission response into a submission or a typed error.
fn interpret(response: GenerateResponse) -> Result<Submission, GenerationError> {
    if response.reason.as_deref() == Some(INSUFFICIENT_TOKENS_REASON) {
        tracing::info!(balance = ?response.tokens, "Submission rejected: insufficient balance");
        return Err(GenerationError::InsufficientBalance {
            balance: response.tokens,
        });
    }

    match response.image_id {
        Some(id) if !id.is_empty() => Ok(Submission {
            handle: JobHandle::new(id),
            balance: response.tokens,
        }),
        _ => Err(GenerationError::MalformedResponse(match response.reason {
            Some(reason) => format!("no job id in response (reason: {})", reason),
            None => "no job id in response".to_string(),
        })),
    }
}
