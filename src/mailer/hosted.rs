//! Client for the hosted identity provider's auth email endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use super::provider::{EmailProvider, ProviderError};

/// Per-request timeout for provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct RecoverBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResendBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    email: &'a str,
}

/// Sends auth emails through a hosted auth REST API.
///
/// Password resets go to `POST {base}/auth/v1/recover` and signup
/// confirmations to `POST {base}/auth/v1/resend`. The API key is sent both
/// as the `apikey` header and as a bearer token.
pub struct HostedAuthProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HostedAuthProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(), ProviderError> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        warn!(status = status.as_u16(), message = %message, "Provider rejected request");

        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull a readable message out of a provider error body.
fn error_message(body: &str) -> String {
    const FIELDS: [&str; 4] = ["msg", "error_description", "message", "error"];

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in FIELDS {
            if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    if body.trim().is_empty() {
        "no response body".to_string()
    } else {
        body.trim().to_string()
    }
}

#[async_trait]
impl EmailProvider for HostedAuthProvider {
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), ProviderError> {
        debug!("Requesting password reset email from provider");

        let mut request = self
            .client
            .post(self.endpoint("recover"))
            .json(&RecoverBody { email });
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }

        self.send(request).await
    }

    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), ProviderError> {
        debug!("Requesting signup confirmation resend from provider");

        let request = self
            .client
            .post(self.endpoint("resend"))
            .json(&ResendBody {
                kind: "signup",
                email,
            });

        self.send(request).await
    }
}
