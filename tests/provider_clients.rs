mod support;

use llm_comparator::error::Error;
use llm_comparator::llm::simulation::SIMULATION_MARKER;
use llm_comparator::llm::{
    ChatCompletionClient, CopilotClient, GeminiClient, ModelClient, PrimaryModel, Provider,
    ProviderResponse,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::FakePrimary;

const TIMEOUT: Duration = Duration::from_secs(5);

fn chatgpt(base_url: &str, key: Option<&str>, primary: Arc<FakePrimary>) -> ChatCompletionClient {
    ChatCompletionClient::new(
        Provider::ChatGpt,
        key.map(String::from),
        "gpt-4o-mini".into(),
        base_url,
        TIMEOUT,
        primary,
    )
    .unwrap()
}

#[tokio::test]
async fn chat_completion_sends_bearer_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "hi there"}],
        })))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "hello"}}]}).to_string())
        .create_async()
        .await;

    let primary = Arc::new(FakePrimary::new());
    let client = chatgpt(&server.url(), Some("sk-test"), primary.clone());
    assert_eq!(client.endpoint(), format!("{}/chat/completions", server.url()));

    assert_eq!(client.generate_response("hi there").await.unwrap(), "hello");
    mock.assert_async().await;
    assert!(primary.generate_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_2xx_carries_status_and_detail() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body(json!({"error": {"message": "rate limited"}}).to_string())
        .create_async()
        .await;

    let client = chatgpt(&server.url(), Some("sk-test"), Arc::new(FakePrimary::new()));
    let err = client.generate_response("q").await.unwrap_err();

    assert!(matches!(err, Error::Api { status_code: 500, .. }));
    let detail = err.to_string();
    assert!(detail.contains("500"), "{detail}");
    assert!(detail.contains("rate limited"), "{detail}");
    assert!(detail.starts_with("OpenAI API Error"), "{detail}");
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status_text() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(502)
        .with_body("<html>upstream down</html>")
        .create_async()
        .await;

    let client = ChatCompletionClient::new(
        Provider::Perplexity,
        Some("pplx".into()),
        "llama-3-sonar-small-32k-online".into(),
        &server.url(),
        TIMEOUT,
        Arc::new(FakePrimary::new()),
    )
    .unwrap();
    let err = client.generate_response("q").await.unwrap_err();

    assert_eq!(err.to_string(), "Perplexity API Error: 502 Bad Gateway");
}

#[tokio::test]
async fn success_without_content_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let client = chatgpt(&server.url(), Some("sk-test"), Arc::new(FakePrimary::new()));
    let err = client.generate_response("q").await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[tokio::test]
async fn missing_key_simulates_without_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let primary = Arc::new(FakePrimary::new());
    let client = chatgpt(&server.url(), Some("  "), primary.clone());
    let text = client.generate_response("write a poem").await.unwrap();

    assert_eq!(text, format!("{SIMULATION_MARKER} persona text"));
    mock.assert_async().await;
    let calls = primary.generate_calls.lock().unwrap();
    assert_eq!(calls[0].0, "write a poem");
    assert!(calls[0].1.as_deref().unwrap().starts_with("You are simulating ChatGPT"));
}

#[tokio::test]
async fn failed_fallback_names_the_provider() {
    let client = chatgpt("http://127.0.0.1:1", None, Arc::new(FakePrimary::failing()));
    let err = client.generate_response("q").await.unwrap_err();

    assert!(matches!(err, Error::FallbackExhausted { provider: Provider::ChatGpt }));
    assert_eq!(
        err.to_string(),
        "ChatGPT API key is missing and the Gemini fallback failed. Ensure API_KEY is set."
    );
}

#[tokio::test]
async fn copilot_simulates_or_refuses() {
    let primary = Arc::new(FakePrimary::new());

    let simulated = CopilotClient::new(None, primary.clone());
    let text = simulated.generate_response("sort a vec").await.unwrap();
    assert!(text.starts_with("[Simulated via Gemini] "));
    let persona = primary.generate_calls.lock().unwrap()[0].1.clone().unwrap();
    assert!(persona.starts_with("You are simulating Microsoft Copilot"));

    let credentialed = CopilotClient::new(Some("copilot-key".into()), primary.clone());
    let err = credentialed.generate_response("sort a vec").await.unwrap_err();
    assert!(matches!(err, Error::NotImplemented { provider: Provider::Copilot }));
    assert!(err.to_string().contains("is not implemented in this application yet"));
    assert_eq!(primary.generate_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn gemini_without_key_fails_before_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = GeminiClient::new(None, "gemini-2.5-flash".into(), &server.url(), TIMEOUT).unwrap();
    assert!(!client.is_configured());

    let err = client.generate("q", None).await.unwrap_err();
    assert!(matches!(err, Error::MissingCredential { provider: Provider::Gemini }));

    let err = client.generate_synthesis("q", &[]).await.unwrap_err();
    assert!(matches!(err, Error::SynthesisUnavailable));
    mock.assert_async().await;
}

#[tokio::test]
async fn gemini_generate_sends_system_instruction() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_header("x-goog-api-key", "g-key")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello?"}]}],
            "systemInstruction": {"parts": [{"text": "be brief"}]},
        })))
        .with_status(200)
        .with_body(
            json!({"candidates": [{"content": {"parts": [{"text": "hi"}]}}]}).to_string(),
        )
        .create_async()
        .await;

    let client = GeminiClient::new(
        Some("g-key".into()),
        "gemini-2.5-flash".into(),
        &server.url(),
        TIMEOUT,
    )
    .unwrap();
    assert_eq!(client.generate("hello?", Some("be brief")).await.unwrap(), "hi");
    mock.assert_async().await;
}

#[tokio::test]
async fn gemini_synthesis_returns_raw_text_and_sources() {
    let raw = "```json\n{\"analysis\":[{\"modelName\":\"ChatGPT\",\"score\":80,\"verdict\":\"Fine.\"}]}\n```";
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"tools": [{"googleSearch": {}}]})),
            Matcher::Regex("--- Response from ChatGPT ---".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": {"parts": [{"text": raw}]},
                    "groundingMetadata": {"groundingChunks": [
                        {"web": {"uri": "https://en.wikipedia.org/wiki/Rayleigh_scattering", "title": "wikipedia.org"}}
                    ]}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = GeminiClient::new(
        Some("g-key".into()),
        "gemini-2.5-flash".into(),
        &server.url(),
        TIMEOUT,
    )
    .unwrap();
    let synthesis = client
        .generate_synthesis(
            "why is the sky blue?",
            &[ProviderResponse {
                provider: Provider::ChatGpt,
                content: "Rayleigh scattering".into(),
            }],
        )
        .await
        .unwrap();
    mock.assert_async().await;

    // Passed through untouched, fences and all.
    assert_eq!(synthesis.summary_text, raw);
    assert_eq!(synthesis.sources.len(), 1);
    assert_eq!(synthesis.sources[0].title.as_deref(), Some("wikipedia.org"));
}

#[tokio::test]
async fn gemini_synthesis_errors_are_wrapped() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(503)
        .with_body(json!({"error": {"message": "overloaded"}}).to_string())
        .create_async()
        .await;

    let client = GeminiClient::new(
        Some("g-key".into()),
        "gemini-2.5-flash".into(),
        &server.url(),
        TIMEOUT,
    )
    .unwrap();
    let err = client.generate_synthesis("q", &[]).await.unwrap_err();

    assert!(matches!(err, Error::Synthesis(_)));
    let message = err.to_string();
    assert!(message.starts_with("Primary Summary Error: "), "{message}");
    assert!(message.contains("503") && message.contains("overloaded"), "{message}");
}

#[tokio::test]
async fn gemini_transport_failure_is_labeled() {
    let client = GeminiClient::new(
        Some("g-key".into()),
        "gemini-2.5-flash".into(),
        "http://127.0.0.1:1",
        TIMEOUT,
    )
    .unwrap();

    let err = client.generate("q", None).await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    let message = err.to_string();
    assert!(message.starts_with("Gemini API Error: "), "{message}");

    let err = client.generate_synthesis("q", &[]).await.unwrap_err();
    let message = err.to_string();
    assert!(
        message.starts_with("Primary Summary Error: Gemini API Error: "),
        "{message}"
    );
}
