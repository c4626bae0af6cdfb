//! Cloud Firestore module.
//!
//! Read-side access to Cloud Firestore over its REST API: listing the documents of a
//! collection and listening for real-time changes to it.
//!
//! # Real-time Updates
//!
//! `CollectionReference::listen()` opens a `documents:listen` stream and returns a
//! stream of `ListenResponse` events.

pub mod listen;
pub mod models;
pub mod reference;
pub mod snapshot;

#[cfg(test)]
mod tests;

use self::reference::CollectionReference;
use crate::config::ClientConfig;
use crate::core::middleware::AuthMiddleware;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for reading Cloud Firestore.
#[derive(Clone)]
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: String,
    database: String,
}

impl FirebaseFirestore {
    /// Creates a new `FirebaseFirestore` instance.
    ///
    /// This is typically called via `CreativeApp::firestore()`.
    pub fn new(config: &ClientConfig, middleware: AuthMiddleware) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(middleware)
            .build();

        Self::new_with_client(client, config.firestore_base_url())
    }

    /// Creates a `FirebaseFirestore` over an existing client and documents base URL
    /// (e.g. `http://localhost:8080/v1/projects/p/databases/(default)/documents`).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let database = database_name(&base_url);
        Self {
            client,
            base_url,
            database,
        }
    }

    /// Gets a `CollectionReference` for a slash-separated collection path
    /// (e.g. `"shops/shop1/images"`).
    pub fn collection(&self, path: &str) -> CollectionReference<'_> {
        CollectionReference {
            client: &self.client,
            base_url: &self.base_url,
            database: &self.database,
            path: path.trim_matches('/').to_string(),
        }
    }
}

/// Extracts `projects/{p}/databases/{d}` from a documents base URL.
fn database_name(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches("/documents");
    match trimmed.find("projects/") {
        Some(idx) => trimmed[idx..].to_string(),
        None => trimmed.to_string(),
    }
}
