//! Gemini adapter (chat completion).
//!
//! Calls the `generateContent` REST endpoint with the whole conversation as `contents`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gtb_core::{conversation::Turn, errors::Error, model::client::ChatModel, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let body = GenerateContentRequest::from_history(history);
        tracing::debug!(model = %self.model, turns = history.len(), "gemini request");

        // The key goes in a header so it never shows up in request-error URLs.
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("gemini request error: {}", e.without_url())))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "gemini request failed: {status} {}",
                error_message(&body)
            )));
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| Error::Model(format!("gemini json error: {e}")))?;

        extract_text(parsed)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_history(history: &'a [Turn]) -> Self {
        let contents = history
            .iter()
            .map(|t| Content {
                role: t.role.as_str(),
                parts: vec![Part { text: &t.text }],
            })
            .collect();
        Self { contents }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
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

fn extract_text(resp: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::Model(format!("gemini blocked the prompt: {reason}")));
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(Error::Model("gemini returned no candidates".to_string()));
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(Error::Model(format!(
            "gemini returned empty text (finish reason: {reason})"
        )));
    }

    Ok(text)
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(w) => {
            let msg = w.error.message.unwrap_or_default();
            match w.error.status {
                Some(status) if !status.is_empty() => format!("{status}: {msg}"),
                _ => msg,
            }
        }
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    const PATH: &str = "/models/gemini-test:generateContent";

    fn client(server: &mockito::ServerGuard) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-test", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    #[tokio::test]
    async fn sends_history_and_joins_text_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::Json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hello"}]},
                    {"role": "model", "parts": [{"text": "Hi!"}]},
                    {"role": "user", "parts": [{"text": "How are you?"}]}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": "Fine, "}, {"text": "thanks."}]},
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let history = vec![
            Turn::user("Hello"),
            Turn::model("Hi!"),
            Turn::user("How are you?"),
        ];
        let reply = client(&server).generate(&history).await.unwrap();

        assert_eq!(reply, "Fine, thanks.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_errors_surface_as_model_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(429)
            .with_body(
                json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server)
            .generate(&[Turn::user("hi")])
            .await
            .unwrap_err();

        match err {
            Error::Model(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("RESOURCE_EXHAUSTED: Quota exceeded"));
                assert!(!msg.contains("test-key"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(json!({"promptFeedback": {"blockReason": "SAFETY"}}).to_string())
            .create_async()
            .await;

        let err = client(&server)
            .generate(&[Turn::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(ref m) if m.contains("SAFETY")));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server)
            .generate(&[Turn::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        let err = extract_text(resp).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
