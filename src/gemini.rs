//! Client for the Gemini generative API: uploads the sanitized page as a file,
//! seeds a few-shot conversation, and requests one schema-constrained
//! completion.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::ExtractionResult;

/// Production API origin. Overridable through configuration so tests can point
/// the client at a local server.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

const MODEL: &str = "gemini-1.5-flash";
const UPLOAD_DISPLAY_NAME: &str = "recepieHtml";

const EXTRACTION_PROMPT: &str = r#"Given this input HTML file, please extract the ingredients of the recepie and return them in a JSON format like:

{
 "ingredients": [
  { "name": "sugar", "amount": "10g" },
  { "name": "salt", "amount": "125g" },
  { "name": "milk", "amount": "250ml" },
 ]
}

Make sure to convert imperial units to metrical units and that the response is in German.
If a ingredient is mentioned multiple times, add the amount of them together.
Further remove additional information of a recepie like water being warm or that flour is needed for something specific. I just want to have the ingredient names."#;

/// Worked example seeded as a model turn. Demonstrates the expected output
/// shape; not validated against the schema at runtime.
const EXAMPLE_RESPONSE: &str = "```json\n{\"ingredients\": [{\"amount\": \"150 ml\", \"name\": \"Wasser, warm\"}, {\"amount\": \"100 g\", \"name\": \"Weizenmehl (Typ 405)\"}, {\"amount\": \"7 g\", \"name\": \"Trockenhefe\"}, {\"amount\": \"230 g\", \"name\": \"Weizenmehl (Typ 405)\"}, {\"amount\": \"30 ml\", \"name\": \"Pflanzensahne\"}, {\"amount\": \"20 g\", \"name\": \"Zucker\"}, {\"amount\": \"2 TL\", \"name\": \"Backmalz\"}, {\"amount\": \"1 TL\", \"name\": \"Ascorbinsäure\"}, {\"amount\": \"½ TL\", \"name\": \"Salz\"}, {\"amount\": \"100 g\", \"name\": \"Alsan Bio oder Alsan S\"}, {\"amount\": \"50 g\", \"name\": \"Alsan Bio oder Alsan S\"}, {\"amount\": \"4 EL\", \"name\": \"Pflanzensahne\"}, {\"amount\": \"n. B.\", \"name\": \"Blaumohn\"}, {\"amount\": \"n. B.\", \"name\": \"Sesam\"}, {\"amount\": \"n. B.\", \"name\": \"Sonnenblumenkerne\"}]}\n\n```";

const TRIGGER_PROMPT: &str = "Do";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("file upload failed: {0}")]
    Upload(String),
    #[error("completion request failed: {0}")]
    Completion(String),
    #[error("model returned a malformed payload: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("failed to create http client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Runs the upload → prompt → parse chain for one sanitized page. No
    /// retries; a single failure at any step aborts the whole request.
    pub async fn extract(&self, sanitized_html: &str) -> Result<ExtractionResult, ExtractionError> {
        let file_uri = self.upload(sanitized_html).await?;
        let payload = self.complete(&file_uri).await?;
        Ok(serde_json::from_str(strip_code_fences(&payload))?)
    }

    /// Submits the sanitized text as a named text file and returns the opaque
    /// file URI the completion request references.
    async fn upload(&self, content: &str) -> Result<String, ExtractionError> {
        let metadata = json!({ "file": { "display_name": UPLOAD_DISPLAY_NAME } });
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| ExtractionError::Upload(e.to_string()))?,
            )
            .part(
                "file",
                reqwest::multipart::Part::text(content.to_string())
                    .mime_str("text/plain")
                    .map_err(|e| ExtractionError::Upload(e.to_string()))?,
            );

        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Upload(format!(
                "file service error {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Upload(e.to_string()))?;

        Ok(uploaded.file.uri)
    }

    /// Sends the seeded conversation plus the trigger message and returns the
    /// first candidate's text parts aggregated into one string.
    async fn complete(&self, file_uri: &str) -> Result<String, ExtractionError> {
        let request = GenerateContentRequest {
            contents: vec![
                Content {
                    role: "user",
                    parts: vec![
                        RequestPart::File {
                            file_data: FileData {
                                mime_type: "text/plain".to_string(),
                                file_uri: file_uri.to_string(),
                            },
                        },
                        RequestPart::Text {
                            text: EXTRACTION_PROMPT.to_string(),
                        },
                    ],
                },
                Content {
                    role: "model",
                    parts: vec![RequestPart::Text {
                        text: EXAMPLE_RESPONSE.to_string(),
                    }],
                },
                Content {
                    role: "user",
                    parts: vec![RequestPart::Text {
                        text: TRIGGER_PROMPT.to_string(),
                    }],
                },
            ],
            generation_config: GenerationConfig {
                temperature: 1.0,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, MODEL, self.api_key
        );

        tracing::debug!(model = MODEL, file_uri, "requesting completion");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Completion(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Completion(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Completion(e.to_string()))?;

        let candidate = completion.candidates.into_iter().next().ok_or_else(|| {
            ExtractionError::Completion("response contained no candidates".to_string())
        })?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() {
            return Err(ExtractionError::Completion(
                "response contained no text parts".to_string(),
            ));
        }

        Ok(text)
    }
}

/// The model sometimes wraps its JSON in a Markdown fence even when asked for
/// a JSON MIME type; the worked example it is seeded with does too.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "ingredients": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "required": ["name", "amount"],
                    "properties": {
                        "name": { "type": "STRING" },
                        "amount": { "type": "STRING" }
                    }
                }
            }
        }
    })
}

// ── Gemini API request/response types ────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    File { file_data: FileData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: i32,
    top_p: f32,
    max_output_tokens: i32,
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_bare_json_untouched() {
        assert_eq!(strip_code_fences(r#"{"ingredients":[]}"#), r#"{"ingredients":[]}"#);
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(
            strip_code_fences("```json\n{\"ingredients\":[]}\n```"),
            r#"{"ingredients":[]}"#
        );
    }

    #[test]
    fn strips_anonymous_fence_and_whitespace() {
        assert_eq!(
            strip_code_fences("  ```\n{\"ingredients\":[]}\n```  \n"),
            r#"{"ingredients":[]}"#
        );
    }

    #[test]
    fn worked_example_parses_into_the_response_contract() {
        let result: ExtractionResult =
            serde_json::from_str(strip_code_fences(EXAMPLE_RESPONSE)).unwrap();
        assert!(!result.ingredients.is_empty());
        assert_eq!(result.ingredients[0].name, "Wasser, warm");
        assert_eq!(result.ingredients[0].amount, "150 ml");
    }
}
