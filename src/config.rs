//! Client configuration.
//!
//! Values come either from code (`ClientConfig::new`) or from the environment via
//! [`ClientConfig::from_env`], which also loads a `.env` file when present.
//!
//! | Variable                          | Required | Default        |
//! |-----------------------------------|----------|----------------|
//! | `CREATIVE_AI_PROJECT_ID`          | yes      | --             |
//! | `CREATIVE_AI_REGION`              | no       | `us-central1`  |
//! | `CREATIVE_AI_FUNCTIONS_URL`       | no       | derived        |
//! | `CREATIVE_AI_FIRESTORE_URL`       | no       | derived        |
//! | `CREATIVE_AI_TENANTS_COLLECTION`  | no       | `shops`        |
//! | `CREATIVE_AI_RESULTS_COLLECTION`  | no       | `images`       |
//! | `CREATIVE_AI_MAX_RETRIES`         | no       | `3`            |

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const FUNCTIONS_API: &str = "https://{region}-{project_id}.cloudfunctions.net";
const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Firestore collection layout for generation results:
/// `{tenants}/{tenant_id}/{results}/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionConfig {
    pub tenants: String,
    pub results: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            tenants: "shops".to_string(),
            results: "images".to_string(),
        }
    }
}

impl CollectionConfig {
    /// Collection path relative to the database documents root.
    pub fn results_path(&self, tenant_id: &str) -> String {
        format!("{}/{}/{}", self.tenants, tenant_id, self.results)
    }
}

/// Names of the callable functions the client invokes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionNames {
    pub generate_brief: String,
    pub generate: String,
    pub submit_phone_number: String,
}

impl Default for FunctionNames {
    fn default() -> Self {
        Self {
            generate_brief: "generateBrief".to_string(),
            generate: "generateImages".to_string(),
            submit_phone_number: "submitPhoneNumber".to_string(),
        }
    }
}

/// Timing of the synthetic progress indicator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressConfig {
    pub tick_ms: u64,
    pub image_secs: u64,
    pub video_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            image_secs: 60,
            video_secs: 300,
        }
    }
}

impl ProgressConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub project_id: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides the Cloud Functions base URL (emulators, tests).
    #[serde(default)]
    pub functions_url: Option<String>,
    /// Overrides the Firestore documents base URL (emulators, tests).
    #[serde(default)]
    pub firestore_url: Option<String>,
    #[serde(default)]
    pub collections: CollectionConfig,
    #[serde(default)]
    pub functions: FunctionNames,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_region() -> String {
    "us-central1".to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            region: default_region(),
            functions_url: None,
            firestore_url: None,
            collections: CollectionConfig::default(),
            functions: FunctionNames::default(),
            progress: ProgressConfig::default(),
            max_retries: default_max_retries(),
        }
    }

    /// Loads the configuration from `CREATIVE_AI_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let project_id = lookup("CREATIVE_AI_PROJECT_ID")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("CREATIVE_AI_PROJECT_ID"))?;

        let mut config = Self::new(project_id);

        if let Some(region) = lookup("CREATIVE_AI_REGION") {
            config.region = region;
        }
        config.functions_url = lookup("CREATIVE_AI_FUNCTIONS_URL");
        config.firestore_url = lookup("CREATIVE_AI_FIRESTORE_URL");
        if let Some(tenants) = lookup("CREATIVE_AI_TENANTS_COLLECTION") {
            config.collections.tenants = tenants;
        }
        if let Some(results) = lookup("CREATIVE_AI_RESULTS_COLLECTION") {
            config.collections.results = results;
        }
        if let Some(value) = lookup("CREATIVE_AI_MAX_RETRIES") {
            config.max_retries = value.parse().map_err(|_| ConfigError::InvalidVar {
                name: "CREATIVE_AI_MAX_RETRIES",
                value,
            })?;
        }

        Ok(config)
    }

    pub fn functions_base_url(&self) -> String {
        match &self.functions_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => FUNCTIONS_API
                .replace("{region}", &self.region)
                .replace("{project_id}", &self.project_id),
        }
    }

    pub fn firestore_base_url(&self) -> String {
        match &self.firestore_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => FIRESTORE_V1_API.replace("{project_id}", &self.project_id),
        }
    }
}
