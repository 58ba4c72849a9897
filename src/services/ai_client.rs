use crate::error::{AppError, AppResult};
use crate::models::{AiProvider, AiSettings};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_TOKENS: i32 = 1024;

fn create_client() -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

fn endpoint(settings: &AiSettings, path: &str) -> String {
    format!("{}{}", settings.base_url.trim_end_matches('/'), path)
}

/// Send a request and decode the JSON body, mapping transport and status
/// failures to `AppError::Upstream`.
async fn send_json<T: DeserializeOwned>(provider: &str, request: RequestBuilder) -> AppResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("{} request failed: {}", provider, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!(
            "{} returned {}: {}",
            provider, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to parse {} response: {}", provider, e)))
}

/// Generate a completion for `prompt` with the configured provider.
pub async fn generate_text(settings: &AiSettings, system: &str, prompt: &str) -> AppResult<String> {
    if !settings.is_usable() {
        return Err(AppError::AiUnavailable);
    }

    debug!(
        provider = settings.provider.as_str(),
        model = %settings.model,
        prompt_len = prompt.len(),
        "Sending generation request"
    );

    let text = match settings.provider {
        AiProvider::Ollama => generate_with_ollama(settings, system, prompt).await?,
        AiProvider::OpenAi => generate_with_openai_compatible(settings, system, prompt).await?,
        AiProvider::Anthropic => generate_with_anthropic(settings, system, prompt).await?,
        AiProvider::Gemini => generate_with_gemini(settings, system, prompt).await?,
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Upstream(format!(
            "{} returned an empty response",
            settings.provider.as_str()
        )));
    }
    Ok(text)
}

async fn generate_with_ollama(settings: &AiSettings, system: &str, prompt: &str) -> AppResult<String> {
    #[derive(Serialize)]
    struct OllamaRequest<'a> {
        model: &'a str,
        prompt: &'a str,
        system: &'a str,
        stream: bool,
    }

    #[derive(Deserialize)]
    struct OllamaResponse {
        response: String,
    }

    let request = create_client()?
        .post(endpoint(settings, "/api/generate"))
        .json(&OllamaRequest {
            model: &settings.model,
            prompt,
            system,
            stream: false,
        });

    let response: OllamaResponse = send_json("Ollama", request).await?;
    Ok(response.response)
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

async fn generate_with_openai_compatible(
    settings: &AiSettings,
    system: &str,
    prompt: &str,
) -> AppResult<String> {
    #[derive(Serialize)]
    struct OpenAiRequest<'a> {
        model: &'a str,
        messages: Vec<Message<'a>>,
        temperature: f64,
    }

    #[derive(Deserialize)]
    struct OpenAiResponse {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: ChoiceMessage,
    }

    #[derive(Deserialize)]
    struct ChoiceMessage {
        content: Option<String>,
    }

    let request = create_client()?
        .post(endpoint(settings, "/chat/completions"))
        .bearer_auth(&settings.api_key)
        .json(&OpenAiRequest {
            model: &settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        });

    let response: OpenAiResponse = send_json("OpenAI", request).await?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}

async fn generate_with_anthropic(
    settings: &AiSettings,
    system: &str,
    prompt: &str,
) -> AppResult<String> {
    #[derive(Serialize)]
    struct AnthropicRequest<'a> {
        model: &'a str,
        max_tokens: i32,
        system: &'a str,
        messages: Vec<Message<'a>>,
    }

    #[derive(Deserialize)]
    struct AnthropicResponse {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        text: Option<String>,
    }

    let request = create_client()?
        .post(endpoint(settings, "/v1/messages"))
        .header("x-api-key", &settings.api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&AnthropicRequest {
            model: &settings.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        });

    let response: AnthropicResponse = send_json("Anthropic", request).await?;
    Ok(response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join(""))
}

async fn generate_with_gemini(settings: &AiSettings, system: &str, prompt: &str) -> AppResult<String> {
    #[derive(Serialize)]
    struct Part<'a> {
        text: &'a str,
    }

    #[derive(Serialize)]
    struct Content<'a> {
        role: &'a str,
        parts: Vec<Part<'a>>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct GeminiRequest<'a> {
        contents: Vec<Content<'a>>,
        system_instruction: Content<'a>,
    }

    #[derive(Deserialize)]
    struct GeminiResponse {
        candidates: Option<Vec<Candidate>>,
    }

    #[derive(Deserialize)]
    struct Candidate {
        content: CandidateContent,
    }

    #[derive(Deserialize)]
    struct CandidateContent {
        #[serde(default)]
        parts: Vec<CandidatePart>,
    }

    #[derive(Deserialize)]
    struct CandidatePart {
        text: Option<String>,
    }

    let url = endpoint(
        settings,
        &format!("/models/{}:generateContent", settings.model),
    );
    let request = create_client()?
        .post(url)
        .query(&[("key", settings.api_key.as_str())])
        .json(&GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Content {
                role: "user",
                parts: vec![Part { text: system }],
            },
        });

    let response: GeminiResponse = send_json("Gemini", request).await?;
    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| AppError::Upstream("Gemini returned no candidates".to_string()))?;

    Ok(candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}
