use async_trait::async_trait;
use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::sync::Arc;

/// Supplies the Firebase ID token of the signed-in user.
///
/// Sign-in itself happens elsewhere; the client only attaches whatever token the
/// provider hands back.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn id_token(&self) -> Result<String, anyhow::Error>;
}

/// A fixed token, e.g. one obtained by the embedding application at sign-in.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn id_token(&self) -> Result<String, anyhow::Error> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct AuthMiddleware {
    provider: Arc<dyn TokenProvider>,
}

impl AuthMiddleware {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticToken(token.into())))
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self.provider.id_token().await.map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Failed to get ID token: {}", e))
        })?;

        // Emulators accept unauthenticated calls.
        if token.is_empty() {
            return next.run(req, extensions).await;
        }

        let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid ID token: {}", e))
        })?;
        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}
