use super::attachment::Attachment;
use super::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

pub const OUTPUT_COUNT_RANGE: RangeInclusive<u8> = 1..=4;
pub const MAX_PRODUCT_IMAGES: usize = 5;
pub const MAX_VIDEO_SOURCE_IMAGES: usize = 3;
pub const MAX_INSPIRATION_IMAGES: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Video,
}

impl GenerationKind {
    /// Maximum number of product (image) or source (video) attachments.
    pub fn max_attachments(self) -> usize {
        match self {
            GenerationKind::Image => MAX_PRODUCT_IMAGES,
            GenerationKind::Video => MAX_VIDEO_SOURCE_IMAGES,
        }
    }

    pub(crate) fn attachments_field(self) -> &'static str {
        match self {
            GenerationKind::Image => "productImages",
            GenerationKind::Video => "sourceImages",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationKind::Image => f.write_str("image"),
            GenerationKind::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Normal,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSettings {
    /// Target size, e.g. `"1024x1024"`.
    pub aspect_ratio: String,
    pub output_count: u8,
    pub language_code: String,
    pub include_text: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: "1024x1024".to_string(),
            output_count: 1,
            language_code: "en".to_string(),
            include_text: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSettings {
    pub aspect_ratio: String,
    pub output_count: u8,
    pub model_tier: ModelTier,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: "1280x720".to_string(),
            output_count: 1,
            model_tier: ModelTier::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GenerationSettings {
    Image(ImageSettings),
    Video(VideoSettings),
}

impl GenerationSettings {
    pub fn for_kind(kind: GenerationKind) -> Self {
        match kind {
            GenerationKind::Image => GenerationSettings::Image(ImageSettings::default()),
            GenerationKind::Video => GenerationSettings::Video(VideoSettings::default()),
        }
    }

    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationSettings::Image(_) => GenerationKind::Image,
            GenerationSettings::Video(_) => GenerationKind::Video,
        }
    }

    pub fn aspect_ratio(&self) -> &str {
        match self {
            GenerationSettings::Image(s) => &s.aspect_ratio,
            GenerationSettings::Video(s) => &s.aspect_ratio,
        }
    }

    pub fn output_count(&self) -> u8 {
        match self {
            GenerationSettings::Image(s) => s.output_count,
            GenerationSettings::Video(s) => s.output_count,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.aspect_ratio().trim().is_empty() {
            return Err(ValidationError::MissingField("aspectRatio"));
        }
        if !OUTPUT_COUNT_RANGE.contains(&self.output_count()) {
            return Err(ValidationError::OutputCountOutOfRange(self.output_count()));
        }
        if let GenerationSettings::Image(s) = self {
            if s.language_code.trim().is_empty() {
                return Err(ValidationError::MissingField("languageCode"));
            }
        }
        Ok(())
    }
}

/// A complete generation request, consumed by value on submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub settings: GenerationSettings,
    pub attachments: Vec<Attachment>,
    pub inspiration: Option<Attachment>,
}

impl GenerationRequest {
    pub fn kind(&self) -> GenerationKind {
        self.settings.kind()
    }

    /// Checks the request invariants, reporting the first unmet field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind();
        if kind == GenerationKind::Image && self.attachments.is_empty() {
            return Err(ValidationError::MissingField("productImages"));
        }
        if self.attachments.len() > kind.max_attachments() {
            return Err(ValidationError::TooManyFiles {
                field: kind.attachments_field(),
                max: kind.max_attachments(),
            });
        }
        self.settings.validate()?;
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField("prompt"));
        }
        Ok(())
    }
}

/// Opaque identifier of a backend generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A standard-quality output and its high-quality render, when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPair {
    pub standard: String,
    pub high_quality: Option<String>,
}

/// The output of one completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub job_id: JobHandle,
    pub images: Vec<UrlPair>,
    /// Assigned by the backend; `None` when the record carries no timestamp.
    pub created_at: Option<DateTime<Utc>>,
    pub prompt: Option<String>,
    pub product_url: Option<String>,
}

impl GenerationResult {
    pub fn standard_urls(&self) -> Vec<&str> {
        self.images.iter().map(|p| p.standard.as_str()).collect()
    }

    /// High-quality URLs, either one per standard URL or none at all.
    pub fn high_quality_urls(&self) -> Vec<&str> {
        self.images
            .iter()
            .map(|p| p.high_quality.as_deref())
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default()
    }
}

/// One entry of the local generation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub job_id: JobHandle,
    pub images: Vec<UrlPair>,
    pub prompt: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&GenerationResult> for HistoryItem {
    fn from(result: &GenerationResult) -> Self {
        Self {
            job_id: result.job_id.clone(),
            images: result.images.clone(),
            prompt: result.prompt.clone(),
            created_at: result.created_at,
        }
    }
}
