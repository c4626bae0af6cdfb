//! Call/response contracts of the generation backend.
//!
//! The wire types mirror the JSON the callable functions exchange and are loosely
//! typed on purpose; callers convert them into typed outcomes right after each call.

use super::attachment::Attachment;
use super::types::{GenerationKind, ModelTier};
use crate::config::FunctionNames;
use crate::functions::{FirebaseFunctions, FunctionsError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reason the backend sends when the account has no tokens left.
pub const INSUFFICIENT_TOKENS_REASON: &str = "tokens";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BriefRequest {
    pub prompt: String,
    pub product_images: Vec<Attachment>,
    pub inspiration_image: Option<Attachment>,
    pub kind: GenerationKind,
    pub tenant_id: String,
    pub no_text: bool,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BriefResponse {
    #[serde(default)]
    pub success: bool,
    pub brief: Option<String>,
    pub reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub attachments: Vec<Attachment>,
    pub inspiration: Option<Attachment>,
    pub prompt: String,
    pub tenant_id: String,
    pub output_count: u8,
    pub size: String,
    pub kind: GenerationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_tier: Option<ModelTier>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_id: Option<String>,
    pub reason: Option<String>,
    pub tokens: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberRequest {
    pub tenant_id: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberResponse {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

/// The backend functions the generation flow depends on.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_brief(&self, request: &BriefRequest) -> Result<BriefResponse, FunctionsError>;

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, FunctionsError>;

    async fn submit_phone_number(
        &self,
        request: &PhoneNumberRequest,
    ) -> Result<PhoneNumberResponse, FunctionsError>;
}

/// `GenerationBackend` over Firebase callable functions.
#[derive(Clone)]
pub struct FunctionsBackend {
    functions: FirebaseFunctions,
    names: FunctionNames,
}

impl FunctionsBackend {
    pub fn new(functions: FirebaseFunctions, names: FunctionNames) -> Self {
        Self { functions, names }
    }
}

#[async_trait]
impl GenerationBackend for FunctionsBackend {
    async fn generate_brief(
        &self,
        request: &BriefRequest,
    ) -> Result<BriefResponse, FunctionsError> {
        self.functions.call(&self.names.generate_brief, request).await
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, FunctionsError> {
        self.functions.call(&self.names.generate, request).await
    }

    async fn submit_phone_number(
        &self,
        request: &PhoneNumberRequest,
    ) -> Result<PhoneNumberResponse, FunctionsError> {
        self.functions.call(&self.names.submit_phone_number, request).await
    }
}
