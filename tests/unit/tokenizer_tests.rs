/*!
 * Tests for the tokenizer client and response decoding
 */

use std::time::Duration;

use serde_json::json;

use dubsync::errors::ProviderError;
use dubsync::tokenizer::{decode_tokens, Token, TokenizeRequest, Tokenizer, TokenizerClient};

/// Test the documented response shape of the tokenizer service
#[test]
fn test_decode_tokens_withServiceResponse_shouldExtractTokens() {
    let value = json!({
        "text": "今日は良い天気",
        "language": "ja",
        "tokens": ["今日", "は", "良い", "天気"],
        "positions": []
    });

    let tokens = decode_tokens(value).unwrap();
    let texts: Vec<&str> = tokens.iter().map(|token| token.text.as_str()).collect();
    assert_eq!(texts, vec!["今日", "は", "良い", "天気"]);
}

/// Test that blank tokens are filtered out
#[test]
fn test_decode_tokens_withBlankEntries_shouldSkipThem() {
    let tokens = decode_tokens(json!(["a", " ", "", {"word": "b"}, {"text": "\t"}])).unwrap();
    assert_eq!(tokens, vec![Token::new("a"), Token::new("b")]);
}

/// Test that an empty array decodes to no tokens
#[test]
fn test_decode_tokens_withEmptyList_shouldReturnEmpty() {
    assert!(decode_tokens(json!([])).unwrap().is_empty());
    assert!(decode_tokens(json!({"tokens": []})).unwrap().is_empty());
}

/// Test that unrecognized shapes are parse errors
#[test]
fn test_decode_tokens_withUnrecognizedShape_shouldReturnParseError() {
    assert!(matches!(decode_tokens(json!(null)), Err(ProviderError::ParseError(_))));
    assert!(matches!(decode_tokens(json!({"status": "ok"})), Err(ProviderError::ParseError(_))));
}

/// Test the request wire format
#[test]
fn test_tokenize_request_shouldSerializeTextAndLanguage() {
    let request = TokenizeRequest::new("Hola mundo", "es");
    assert_eq!(serde_json::to_value(&request).unwrap(), json!({"text": "Hola mundo", "language": "es"}));
}

/// Test that an unreachable service yields an error instead of hanging
#[tokio::test]
async fn test_tokenize_withUnreachableService_shouldFail() {
    let client = TokenizerClient::new("http://127.0.0.1:9", Duration::from_secs(2));

    let result = client.tokenize(&TokenizeRequest::new("Hola mundo", "es")).await;
    assert!(result.is_err());
}

/// Test that the health check reports connection errors
#[tokio::test]
async fn test_test_connection_withUnreachableService_shouldReturnConnectionError() {
    let client = TokenizerClient::new("http://127.0.0.1:9/", Duration::from_secs(2));

    let result = client.test_connection().await;
    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
}
