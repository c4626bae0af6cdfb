pub mod config;
pub mod core;
pub mod firestore;
pub mod functions;
pub mod generation;
pub mod telemetry;

use crate::config::ClientConfig;
use crate::core::middleware::{AuthMiddleware, TokenProvider};
use firestore::FirebaseFirestore;
use functions::FirebaseFunctions;
use generation::{
    FirestoreResults, FunctionsBackend, GenerationKind, GenerationSession, ProgressSimulator,
    SessionEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct CreativeApp {
    config: ClientConfig,
    middleware: AuthMiddleware,
}

impl CreativeApp {
    /// Creates an app that authenticates every request with a fixed ID token.
    pub fn new(config: ClientConfig, id_token: impl Into<String>) -> Self {
        Self {
            config,
            middleware: AuthMiddleware::with_token(id_token),
        }
    }

    /// Creates an app that asks `provider` for a fresh ID token on each request.
    pub fn with_token_provider(config: ClientConfig, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            config,
            middleware: AuthMiddleware::new(provider),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn functions(&self) -> FirebaseFunctions {
        FirebaseFunctions::new(&self.config, self.middleware.clone())
    }

    pub fn firestore(&self) -> FirebaseFirestore {
        FirebaseFirestore::new(&self.config, self.middleware.clone())
    }

    pub fn backend(&self) -> FunctionsBackend {
        FunctionsBackend::new(self.functions(), self.config.functions.clone())
    }

    pub fn results(&self) -> FirestoreResults {
        FirestoreResults::new(self.firestore(), self.config.collections.clone())
    }

    /// Starts a generation session for `tenant_id`.
    ///
    /// `has_contact_info` is the account's current gate state; when `false`, results
    /// are held until a phone number is submitted.
    pub fn session(
        &self,
        tenant_id: impl Into<String>,
        kind: GenerationKind,
        has_contact_info: bool,
    ) -> (GenerationSession, UnboundedReceiver<SessionEvent>) {
        GenerationSession::new(
            tenant_id,
            kind,
            Arc::new(self.backend()),
            Arc::new(self.results()),
            ProgressSimulator::new(&self.config.progress),
            has_contact_info,
        )
    }
}
