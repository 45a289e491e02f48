//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Sends one user turn to `generateContent` and returns the first text part
//! of the reply. The API key comes from `secret.json` or `GEMINI_API_KEY`.

use async_trait::async_trait;
use equilibria_core::ApiError;
use equilibria_core::chat::TextGenerator;
use equilibria_core::config::{ChatSettings, SecretConfig};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text generator that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiApiAgent {
    /// Creates an agent for the configured model and endpoint.
    pub fn new(api_key: impl Into<String>, settings: &ChatSettings) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|err| ApiError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key,
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the agent from loaded secrets.
    ///
    /// A model named in `secret.json` wins over `config.toml`.
    pub fn from_secrets(secrets: &SecretConfig, settings: &ChatSettings) -> Result<Self, ApiError> {
        let gemini = secrets.gemini.as_ref().ok_or(ApiError::MissingApiKey)?;
        let agent = Self::new(gemini.api_key.clone(), settings)?;
        Ok(match &gemini.model_name {
            Some(model) if !model.trim().is_empty() => agent.with_model(model.trim()),
            _ => agent,
        })
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, ApiError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.endpoint,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ApiError::Timeout
                } else {
                    // without_url keeps the key out of the message
                    ApiError::Network(err.without_url().to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| ApiError::MalformedResponse(err.without_url().to_string()))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiApiAgent {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        tracing::debug!(model = %self.model, chars = prompt.len(), "[Gemini] generateContent");
        let result = self.send_request(&request).await;
        if let Err(err) = &result {
            tracing::warn!(model = %self.model, error = %err, "[Gemini] request failed");
        }
        result
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, ApiError> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .filter(|text| !text.trim().is_empty())
        .ok_or(ApiError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ApiError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return ApiError::Quota(message);
    }

    let retryable = matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ApiError::Http {
        status: status.as_u16(),
        message,
        retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Retry-After HTTP-date parsing is omitted for simplicity
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use equilibria_core::config::GeminiConfig;

    fn response(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extracts_first_text_part() {
        let parsed = response(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello there"}]}}]}"#,
        );
        assert_eq!(extract_text_response(parsed).unwrap(), "Hello there");
    }

    #[test]
    fn test_missing_text_is_empty_response() {
        assert_eq!(
            extract_text_response(response(r#"{"candidates":[]}"#)),
            Err(ApiError::EmptyResponse)
        );
        assert_eq!(
            extract_text_response(response(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)),
            Err(ApiError::EmptyResponse)
        );
    }

    #[test]
    fn test_http_error_mapping() {
        let body = r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#;
        let err = map_http_error(
            StatusCode::SERVICE_UNAVAILABLE,
            body.to_string(),
            Some(Duration::from_secs(7)),
        );
        assert_eq!(
            err,
            ApiError::Http {
                status: 503,
                message: "UNAVAILABLE: overloaded".to_string(),
                retryable: true,
                retry_after: Some(Duration::from_secs(7)),
            }
        );
        assert!(matches!(
            map_http_error(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string(), None),
            ApiError::Quota(message) if message == "slow down"
        ));
    }

    #[test]
    fn test_parse_retry_after_seconds_only() {
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("12"))),
            Some(Duration::from_secs(12))
        );
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static(
                "Wed, 21 Oct 2015 07:28:00 GMT"
            ))),
            None
        );
    }

    #[test]
    fn test_from_secrets_prefers_secret_model() {
        let secrets = SecretConfig {
            gemini: Some(GeminiConfig {
                api_key: "key".to_string(),
                model_name: Some("gemini-1.5-pro".to_string()),
            }),
            identity: None,
        };
        let agent = GeminiApiAgent::from_secrets(&secrets, &ChatSettings::default()).unwrap();
        assert_eq!(agent.model(), "gemini-1.5-pro");
    }

    #[test]
    fn test_missing_key_is_rejected() {
        assert!(matches!(
            GeminiApiAgent::from_secrets(&SecretConfig::default(), &ChatSettings::default()),
            Err(ApiError::MissingApiKey)
        ));
        assert!(matches!(
            GeminiApiAgent::new("  ", &ChatSettings::default()),
            Err(ApiError::MissingApiKey)
        ));
    }
}
