//! Cloud Functions (callable) module.
//!
//! Callable functions are invoked with `POST {base_url}/{name}` and a `{"data": ...}`
//! envelope. The function answers with `{"result": ...}` or, on failure, with
//! `{"error": {"message": ..., "status": ...}}`.

pub mod models;


use crate::config::ClientConfig;
use crate::core::middleware::AuthMiddleware;
use crate::core::parse_error_response;
use models::{CallableRequest, CallableResponse};
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while calling a function.
#[derive(Error, Debug)]
pub enum FunctionsError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the function itself.
    #[error("API error: {0}")]
    ApiError(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for invoking callable Cloud Functions.
#[derive(Clone)]
pub struct FirebaseFunctions {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseFunctions {
    /// Creates a new `FirebaseFunctions` instance.
    ///
    /// This is typically called via `CreativeApp::functions()`.
    pub fn new(config: &ClientConfig, middleware: AuthMiddleware) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(middleware)
            .build();

        Self {
            client,
            base_url: config.functions_base_url(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Invokes the callable function `name` with `data` and decodes its result.
    pub async fn call<I, O>(&self, name: &str, data: &I) -> Result<O, FunctionsError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, name);
        tracing::debug!(function = name, "Calling function");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&CallableRequest { data })?)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = parse_error_response(response, &format!("Call to {} failed", name)).await;
            tracing::warn!(function = name, error = %message, "Function returned an error");
            return Err(FunctionsError::ApiError(message));
        }

        let body: CallableResponse<O> = response.json().await?;
        Ok(body.result)
    }
}
