pub mod middleware;

use serde::Deserialize;

/// Error body returned by Google APIs and by Firebase callable functions.
///
/// REST APIs fill `code`; callable functions only send `message` and `status`.
#[derive(Debug, Deserialize)]
pub struct FirebaseErrorResponse {
    pub error: FirebaseErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorDetails {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl FirebaseErrorResponse {
    pub fn display_message(&self) -> String {
        match (&self.error.status, self.error.code) {
            (Some(status), _) => format!("{} ({})", self.error.message, status),
            (None, Some(code)) => format!("{} (code: {})", self.error.message, code),
            (None, None) => self.error.message.clone(),
        }
    }
}

pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> String {
    let status = response.status();
    match response.json::<FirebaseErrorResponse>().await {
        Ok(error_resp) => error_resp.display_message(),
        Err(_) => format!("{}: {}", default_msg, status),
    }
}
