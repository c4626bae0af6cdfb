//! Step-by-step collection of a generation request.
//!
//! The wizard walks `Upload -> Settings -> Concept -> Review`. Each step checks its own
//! required fields before `advance` moves on, and entering `Concept` drafts a brief
//! through the backend. Files over the per-kind limits are rejected when added, never
//! truncated.

use super::attachment::Attachment;
use super::backend::{BriefRequest, GenerationBackend, INSUFFICIENT_TOKENS_REASON};
use super::error::{GenerationError, ValidationError};
use super::types::{
    GenerationKind, GenerationRequest, GenerationSettings, MAX_INSPIRATION_IMAGES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Upload,
    Settings,
    Concept,
    Review,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::Upload => Some(WizardStep::Settings),
            WizardStep::Settings => Some(WizardStep::Concept),
            WizardStep::Concept => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WizardStep::Upload => None,
            WizardStep::Settings => Some(WizardStep::Upload),
            WizardStep::Concept => Some(WizardStep::Settings),
            WizardStep::Review => Some(WizardStep::Concept),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    settings: GenerationSettings,
    attachments: Vec<Attachment>,
    inspiration: Option<Attachment>,
    idea: String,
    prompt: String,
}

impl Wizard {
    pub fn new(kind: GenerationKind) -> Self {
        Self {
            step: WizardStep::Upload,
            settings: GenerationSettings::for_kind(kind),
            attachments: Vec::new(),
            inspiration: None,
            idea: String::new(),
            prompt: String::new(),
        }
    }

    pub fn kind(&self) -> GenerationKind {
        self.settings.kind()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Mutable access to the settings. Values are checked when leaving the
    /// settings step and again on `submit`.
    pub fn settings_mut(&mut self) -> &mut GenerationSettings {
        &mut self.settings
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn inspiration(&self) -> Option<&Attachment> {
        self.inspiration.as_ref()
    }

    /// The user's free-form idea sent to the brief generator.
    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn set_idea(&mut self, idea: impl Into<String>) {
        self.idea = idea.into();
    }

    /// The final ad concept; pre-filled with the generated brief.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Adds product (image) or source (video) files. The whole batch is rejected if
    /// it would exceed the limit for the wizard's kind.
    pub fn add_attachments(&mut self, files: Vec<Attachment>) -> Result<(), ValidationError> {
        let kind = self.kind();
        if let Some(file) = files.iter().find(|f| !f.is_image()) {
            return Err(ValidationError::UnsupportedMediaType(file.name.clone()));
        }
        if self.attachments.len() + files.len() > kind.max_attachments() {
            return Err(ValidationError::TooManyFiles {
                field: kind.attachments_field(),
                max: kind.max_attachments(),
            });
        }
        self.attachments.extend(files);
        Ok(())
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// Sets the single inspiration image. A second one is rejected until the first
    /// is cleared.
    pub fn set_inspiration(&mut self, file: Attachment) -> Result<(), ValidationError> {
        if !file.is_image() {
            return Err(ValidationError::UnsupportedMediaType(file.name));
        }
        if self.inspiration.is_some() {
            return Err(ValidationError::TooManyFiles {
                field: "inspirationImage",
                max: MAX_INSPIRATION_IMAGES,
            });
        }
        self.inspiration = Some(file);
        Ok(())
    }

    pub fn clear_inspiration(&mut self) -> Option<Attachment> {
        self.inspiration.take()
    }

    /// Checks the required fields of the current step.
    pub fn validate_step(&self) -> Result<(), ValidationError> {
        match self.step {
            WizardStep::Upload => self.validate_upload(),
            WizardStep::Settings => self.settings.validate(),
            WizardStep::Concept => self.validate_prompt(),
            WizardStep::Review => self.build().validate(),
        }
    }

    fn validate_upload(&self) -> Result<(), ValidationError> {
        if self.kind() == GenerationKind::Image && self.attachments.is_empty() {
            return Err(ValidationError::MissingField("productImages"));
        }
        Ok(())
    }

    fn validate_prompt(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField("prompt"));
        }
        Ok(())
    }

    /// Validates the current step and moves to the next one. Entering the concept
    /// step drafts a brief first; if that fails the wizard stays where it is.
    pub async fn advance(
        &mut self,
        backend: &dyn GenerationBackend,
        tenant_id: &str,
    ) -> Result<WizardStep, GenerationError> {
        self.validate_step()?;

        let Some(next) = self.step.next() else {
            return Ok(self.step);
        };

        if next == WizardStep::Concept {
            self.request_brief(backend, tenant_id).await?;
        }

        self.step = next;
        Ok(next)
    }

    /// Goes back one step, keeping everything entered so far.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn brief_request(&self, tenant_id: &str) -> BriefRequest {
        let no_text = match &self.settings {
            GenerationSettings::Image(s) => !s.include_text,
            GenerationSettings::Video(_) => false,
        };
        BriefRequest {
            prompt: self.idea.clone(),
            product_images: self.attachments.clone(),
            inspiration_image: self.inspiration.clone(),
            kind: self.kind(),
            tenant_id: tenant_id.to_string(),
            no_text,
        }
    }

    /// Drafts an ad concept from the uploaded files and idea. On success the brief
    /// replaces the editable prompt.
    pub async fn request_brief(
        &mut self,
        backend: &dyn GenerationBackend,
        tenant_id: &str,
    ) -> Result<String, GenerationError> {
        self.validate_upload()?;

        let request = self.brief_request(tenant_id);
        tracing::info!(tenant_id, kind = %request.kind, "Requesting brief");

        let response = backend
            .generate_brief(&request)
            .await
            .map_err(|e| GenerationError::BriefGenerationFailed(e.to_string()))?;

        if response.reason.as_deref() == Some(INSUFFICIENT_TOKENS_REASON) {
            return Err(GenerationError::InsufficientBalance { balance: None });
        }

        match response.brief {
            Some(brief) if response.success && !brief.trim().is_empty() => {
                self.prompt = brief.clone();
                Ok(brief)
            }
            _ => Err(GenerationError::BriefGenerationFailed(
                response
                    .error
                    .unwrap_or_else(|| "backend returned no brief".to_string()),
            )),
        }
    }

    fn build(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            settings: self.settings.clone(),
            attachments: self.attachments.clone(),
            inspiration: self.inspiration.clone(),
        }
    }

    /// Produces the request, or the first unmet field in step order.
    pub fn submit(&self) -> Result<GenerationRequest, ValidationError> {
        let request = self.build();
        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionsError;
    use crate::generation::backend::{
        BriefResponse, GenerateRequest, GenerateResponse, PhoneNumberRequest, PhoneNumberResponse,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct BriefBackend {
        response: Mutex<Option<Result<BriefResponse, FunctionsError>>>,
        requests: Mutex<Vec<BriefRequest>>,
    }

    impl BriefBackend {
        fn new(response: Result<BriefResponse, FunctionsError>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for BriefBackend {
        async fn generate_brief(
            &self,
            request: &BriefRequest,
        ) -> Result<BriefResponse, FunctionsError> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.lock().unwrap().take().expect("unexpected brief call")
        }

        async fn generate(&self, _: &GenerateRequest) -> Result<GenerateResponse, FunctionsError> {
            unreachable!("wizard never submits jobs")
        }

        async fn submit_phone_number(
            &self,
            _: &PhoneNumberRequest,
        ) -> Result<PhoneNumberResponse, FunctionsError> {
            unreachable!("wizard never submits phone numbers")
        }
    }

    fn png(name: &str) -> Attachment {
        Attachment::from_bytes(name, "image/png", b"png")
    }

    fn brief_ok(text: &str) -> Result<BriefResponse, FunctionsError> {
        Ok(BriefResponse {
            success: true,
            brief: Some(text.to_string()),
            ..Default::default()
        })
    }

    async fn wizard_at_settings(backend: &BriefBackend) -> Wizard {
        let mut wizard = Wizard::new(GenerationKind::Image);
        wizard.add_attachments(vec![png("shoe.png")]).unwrap();
        assert_eq!(wizard.advance(backend, "shop1").await.unwrap(), WizardStep::Settings);
        wizard
    }

    #[test]
    fn test_attachment_limits_reject_instead_of_truncating() {
        let mut wizard = Wizard::new(GenerationKind::Image);
        wizard.add_attachments(vec![png("1"), png("2"), png("3")]).unwrap();

        let err = wizard
            .add_attachments(vec![png("4"), png("5"), png("6")])
            .unwrap_err();
        assert_eq!(err, ValidationError::TooManyFiles { field: "productImages", max: 5 });
        assert_eq!(wizard.attachments().len(), 3);

        wizard.add_attachments(vec![png("4"), png("5")]).unwrap();
        assert_eq!(wizard.attachments().len(), 5);

        let mut video = Wizard::new(GenerationKind::Video);
        let err = video
            .add_attachments(vec![png("1"), png("2"), png("3"), png("4")])
            .unwrap_err();
        assert_eq!(err, ValidationError::TooManyFiles { field: "sourceImages", max: 3 });
        assert!(video.attachments().is_empty());
    }

    #[test]
    fn test_single_inspiration_image() {
        let mut wizard = Wizard::new(GenerationKind::Image);
        wizard.set_inspiration(png("mood.png")).unwrap();
        assert!(matches!(
            wizard.set_inspiration(png("other.png")),
            Err(ValidationError::TooManyFiles { field: "inspirationImage", max: 1 })
        ));
        assert_eq!(wizard.inspiration().unwrap().name, "mood.png");

        wizard.clear_inspiration();
        wizard.set_inspiration(png("other.png")).unwrap();
        assert_eq!(wizard.inspiration().unwrap().name, "other.png");
    }

    #[test]
    fn test_non_image_files_rejected() {
        let mut wizard = Wizard::new(GenerationKind::Image);
        let pdf = Attachment::from_bytes("deck.pdf", "application/pdf", b"%PDF");
        assert_eq!(
            wizard.add_attachments(vec![png("a.png"), pdf]),
            Err(ValidationError::UnsupportedMediaType("deck.pdf".to_string()))
        );
        assert!(wizard.attachments().is_empty());
    }

    #[tokio::test]
    async fn test_upload_step_requires_images_for_image_kind() {
        let backend = BriefBackend::new(brief_ok("unused"));
        let mut wizard = Wizard::new(GenerationKind::Image);

        let err = wizard.advance(&backend, "shop1").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Validation(ValidationError::MissingField("productImages"))
        ));
        assert_eq!(wizard.step(), WizardStep::Upload);

        let mut video = Wizard::new(GenerationKind::Video);
        assert_eq!(video.advance(&backend, "shop1").await.unwrap(), WizardStep::Settings);
    }

    #[tokio::test]
    async fn test_entering_concept_drafts_brief() {
        let backend = BriefBackend::new(brief_ok("Bold sneakers on a neon street"));
        let mut wizard = wizard_at_settings(&backend).await;
        wizard.set_idea("sneaker ad");
        if let GenerationSettings::Image(s) = wizard.settings_mut() {
            s.include_text = false;
        }

        assert_eq!(wizard.advance(&backend, "shop1").await.unwrap(), WizardStep::Concept);
        assert_eq!(wizard.prompt(), "Bold sneakers on a neon street");

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "sneaker ad");
        assert_eq!(requests[0].tenant_id, "shop1");
        assert!(requests[0].no_text);
        assert_eq!(requests[0].product_images.len(), 1);
    }

    #[tokio::test]
    async fn test_brief_insufficient_balance_keeps_step() {
        let backend = BriefBackend::new(Ok(BriefResponse {
            success: false,
            reason: Some("tokens".to_string()),
            ..Default::default()
        }));
        let mut wizard = wizard_at_settings(&backend).await;

        let err = wizard.advance(&backend, "shop1").await.unwrap_err();
        assert!(err.is_insufficient_balance());
        assert_eq!(wizard.step(), WizardStep::Settings);
    }

    #[tokio::test]
    async fn test_brief_failure_is_generic() {
        let backend = BriefBackend::new(Ok(BriefResponse {
            success: false,
            error: Some("model overloaded".to_string()),
            ..Default::default()
        }));
        let mut wizard = wizard_at_settings(&backend).await;

        match wizard.advance(&backend, "shop1").await.unwrap_err() {
            GenerationError::BriefGenerationFailed(msg) => assert_eq!(msg, "model overloaded"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(wizard.step(), WizardStep::Settings);
        assert!(wizard.prompt().is_empty());
    }

    #[tokio::test]
    async fn test_brief_transport_error_is_not_retried() {
        let backend = BriefBackend::new(Err(FunctionsError::ApiError("unavailable".to_string())));
        let mut wizard = wizard_at_settings(&backend).await;

        let err = wizard.advance(&backend, "shop1").await.unwrap_err();
        assert!(matches!(err, GenerationError::BriefGenerationFailed(_)));
        assert_eq!(backend.requests.lock().unwrap().len(), 1);
        assert_eq!(wizard.step(), WizardStep::Settings);
    }

    #[tokio::test]
    async fn test_settings_step_checks_output_count() {
        let backend = BriefBackend::new(brief_ok("unused"));
        let mut wizard = wizard_at_settings(&backend).await;
        if let GenerationSettings::Image(s) = wizard.settings_mut() {
            s.output_count = 7;
        }

        let err = wizard.advance(&backend, "shop1").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Validation(ValidationError::OutputCountOutOfRange(7))
        ));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_back_and_submit() {
        let backend = BriefBackend::new(brief_ok("Concept"));
        let mut wizard = wizard_at_settings(&backend).await;
        wizard.advance(&backend, "shop1").await.unwrap();

        assert_eq!(wizard.back(), WizardStep::Settings);
        assert_eq!(wizard.prompt(), "Concept");

        wizard.set_prompt("  ");
        assert_eq!(wizard.submit(), Err(ValidationError::MissingField("prompt")));

        wizard.set_prompt("Revised concept");
        let request = wizard.submit().unwrap();
        assert_eq!(request.prompt, "Revised concept");
        assert_eq!(request.kind(), GenerationKind::Image);
        assert_eq!(request.attachments.len(), 1);
    }
}
