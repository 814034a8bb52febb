use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Tokenize request sent to the tokenizer service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeRequest {
    /// Sentence to split into words
    pub text: String,
    /// Language code of the sentence
    pub language: String,
}

impl TokenizeRequest {
    /// Create a new tokenize request
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }
}

/// A single word returned by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Word text
    pub text: String,
}

impl Token {
    /// Create a token
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Token as it appears on the wire: a bare string or an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireToken {
    Bare(String),
    Object {
        #[serde(alias = "word")]
        text: String,
    },
}

/// Accepted response shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireResponse {
    List(Vec<WireToken>),
    Wrapped { tokens: Vec<WireToken> },
    Single(WireToken),
}

/// Decode a tokenizer response body into tokens
///
/// Accepts a bare token array, an object with a `tokens` array, or a single
/// token object. Tokens may be strings or objects carrying `text` or `word`.
/// Blank tokens are skipped.
pub fn decode_tokens(value: serde_json::Value) -> Result<Vec<Token>, ProviderError> {
    let response: WireResponse = serde_json::from_value(value)
        .map_err(|e| ProviderError::ParseError(format!("Unrecognized tokenizer response: {}", e)))?;

    let wire_tokens = match response {
        WireResponse::List(tokens) | WireResponse::Wrapped { tokens } => tokens,
        WireResponse::Single(token) => vec![token],
    };

    Ok(wire_tokens.into_iter()
        .map(|token| match token {
            WireToken::Bare(text) | WireToken::Object { text } => text,
        })
        .filter(|text| !text.trim().is_empty())
        .map(Token::new)
        .collect())
}

/// Word-level tokenizer used by the renderer
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Split a sentence into words
    async fn tokenize(&self, request: &TokenizeRequest) -> Result<Vec<Token>, ProviderError>;
}

/// Health response of the tokenizer service
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    /// Reported status, `"healthy"` when up
    pub status: String,
    /// Service name
    #[serde(default)]
    pub service: String,
    /// Service version
    #[serde(default)]
    pub version: String,
}

/// HTTP client for the tokenizer service
#[derive(Debug, Clone)]
pub struct TokenizerClient {
    /// HTTP client for API requests
    client: Client,
    /// Service base URL
    endpoint: String,
}

impl TokenizerClient {
    /// Create a new tokenizer client
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.endpoint.trim_end_matches('/'), path)
    }

    /// Test the connection to the tokenizer service
    pub async fn test_connection(&self) -> Result<HealthResponse, ProviderError> {
        let response = self.client.get(self.api_url("health"))
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Tokenizer service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: "Health check failed".to_string(),
            });
        }

        let health = response.json::<HealthResponse>().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if health.status != "healthy" {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: format!("Service reports status '{}'", health.status),
            });
        }

        Ok(health)
    }
}

#[async_trait]
impl Tokenizer for TokenizerClient {
    async fn tokenize(&self, request: &TokenizeRequest) -> Result<Vec<Token>, ProviderError> {
        let response = self.client.post(self.api_url("tokenize"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Tokenizer API error ({}): {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let value = response.json::<serde_json::Value>().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        let tokens = decode_tokens(value)?;

        debug!("Tokenized {:?} ({}) into {} tokens", request.text, request.language, tokens.len());
        Ok(tokens)
    }
}
