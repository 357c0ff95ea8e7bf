use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use tidyup_core::config::AdvisorConfig;
use tidyup_core::ActionKind;
use tidyup_core::ProposedAction;
use tracing::debug;

use crate::error::RequestError;

const SYSTEM_PROMPT: &str = "\
You tidy up a directory. Each line of the listing shows size, permissions, \
modification date and a path relative to the directory root; directories end with '/'.
Answer with one suggestion per listed path:
- \"move\" relocates or renames an entry: \"name\" is its current path, \"result\" its new path.
- \"keep\" leaves an entry where it is: \"result\" repeats \"name\".
- \"create\" introduces a new directory: \"name\" is empty, \"result\" is the directory path ending in '/'.
Group related files into directories and prefer lowercase names with underscores instead of spaces. \
Never choose a result that is already taken by another entry or suggestion, and never leave the directory root.";

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl GeminiAdvisor {
    pub fn new(config: &AdvisorConfig, api_key: Option<String>) -> Result<Self, RequestError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Reads the credential from the variable named in the config. A missing
    /// key only surfaces once a plan is requested.
    pub fn from_env(config: &AdvisorConfig) -> Result<Self, RequestError> {
        Self::new(config, std::env::var(&config.api_key_env).ok())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn propose(
        &self,
        listing: &str,
        instruction: Option<&str>,
    ) -> Result<Vec<ProposedAction>, RequestError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RequestError::MissingCredential(self.api_key_env.clone()))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body = build_request_body(&user_prompt(listing, instruction));
        debug!(model = %self.model, bytes = listing.len(), "sending plan request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(RequestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let proposals = parse_response(&text)?;
        debug!(count = proposals.len(), "plan received");
        Ok(proposals)
    }
}

fn user_prompt(listing: &str, instruction: Option<&str>) -> String {
    match instruction.map(str::trim).filter(|text| !text.is_empty()) {
        Some(instruction) => format!("additional prompt:\n{instruction}\ndata:\n{listing}"),
        None => listing.to_string(),
    }
}

fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "action": { "type": "STRING", "enum": ["move", "keep", "create"] },
                "name": { "type": "STRING" },
                "result": { "type": "STRING" }
            },
            "required": ["action", "name", "result"]
        }
    })
}

fn build_request_body(prompt: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_PROMPT }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

async fn read_capped_error_body(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    text.chars().take(MAX_ERROR_BODY).collect()
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    action: ActionKind,
    #[serde(default)]
    name: String,
    #[serde(default)]
    result: String,
}

/// Turns a `generateContent` body into proposals. Every text part of the
/// first candidate must be a JSON array of suggestions.
pub fn parse_response(body: &str) -> Result<Vec<ProposedAction>, RequestError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|err| RequestError::Malformed(err.to_string()))?;

    let texts: Vec<String> = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if texts.is_empty() {
        return Err(RequestError::EmptyResponse);
    }

    let mut proposals = Vec::new();
    for text in texts {
        let suggestions: Vec<Suggestion> = serde_json::from_str(&text)
            .map_err(|err| RequestError::Malformed(err.to_string()))?;
        for suggestion in suggestions {
            proposals.push(to_proposal(suggestion)?);
        }
    }
    Ok(proposals)
}

fn to_proposal(suggestion: Suggestion) -> Result<ProposedAction, RequestError> {
    let Suggestion {
        action,
        name,
        result,
    } = suggestion;

    match action {
        ActionKind::Move => {
            if name.trim().is_empty() || result.trim().is_empty() {
                return Err(RequestError::InvalidSuggestion(format!(
                    "move needs both a name and a result (name `{name}`, result `{result}`)"
                )));
            }
            Ok(ProposedAction::new(name, ActionKind::Move, result))
        }
        ActionKind::Keep => {
            if name.trim().is_empty() {
                return Err(RequestError::InvalidSuggestion(
                    "keep without a name".to_string(),
                ));
            }
            let result = if result.trim().is_empty() {
                name.clone()
            } else {
                result
            };
            Ok(ProposedAction::new(name, ActionKind::Keep, result))
        }
        ActionKind::Create => {
            if !name.trim().is_empty() {
                return Err(RequestError::InvalidSuggestion(format!(
                    "create must not name an existing entry (`{name}`)"
                )));
            }
            if result.trim().is_empty() {
                return Err(RequestError::InvalidSuggestion(
                    "create without a result".to_string(),
                ));
            }
            Ok(ProposedAction::create(result))
        }
    }
}
