use super::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SYSTEM_PROMPT: &str = "You are a text generation assistant for a typing speed website. \
    Your task is to generate exactly 200 words of plain, engaging, natural-sounding English text of similar length. \
    The content should resemble something a human might write: a mix of general observations, short narratives, trivia, or random thoughts. \
    Use proper grammar and a balance of simple and complex sentence structures. \
    Avoid difficult or rare words, technical terms, poetry, or code. \
    Do NOT use any markdown, formatting, or line breaks. Do NOT include lists, emojis, or headings.";

/// Direct Gemini `generateContent` provider
pub struct GeminiProvider {
    api_key: String,
    model: String,
    timeout: Duration,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new provider calling the public Gemini REST API
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::with_base_url(api_key, model, timeout, GEMINI_BASE_URL.to_string())
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        timeout: Duration,
        base_url: String,
    ) -> Self {
        Self {
            api_key,
            model,
            timeout,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
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
    text: String,
}

impl GenerateContentRequest {
    fn typing_passage() -> Self {
        // Varying seed keeps repeat fetches from returning the same passage.
        let seed: u32 = rand::rng().random_range(0..100_000);
        Self {
            system_instruction: Content {
                role: Some("system".to_string()),
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: format!(
                        "Generate a random block of plain English text suitable for a typing test, \
                         make sure all words are in similar length. It must be exactly {} words. Seed={}",
                        PASSAGE_WORDS, seed
                    ),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 250,
                temperature: 0.6,
            },
        }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn fetch_passage(&self) -> GatewayResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest::typing_passage();

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| GatewayError::Timeout(self.timeout))?
        .map_err(|e| GatewayError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::ApiError(format!(
                "Gemini API returned status: {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(e.to_string()))?;

        let raw = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| GatewayError::ParseError("no candidates in response".to_string()))?;

        Ok(strip_markdown(raw))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape_matches_gemini_api() {
        let body = serde_json::to_value(GenerateContentRequest::typing_passage()).unwrap();

        assert!(body.get("systemInstruction").is_some());
        assert_eq!(
            body["generationConfig"],
            json!({"maxOutputTokens": 250, "temperature": 0.6})
        );
        let user_text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(user_text.contains("exactly 200 words"));
        assert!(user_text.contains("Seed="));
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.candidates.is_empty());

        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "a passage"}]}}]
        }))
        .unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "a passage");
    }

    #[tokio::test]
    #[ignore] // Only run with a real GEMINI_API_KEY exported
    async fn test_gemini_generate_live() {
        let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY not set");
        let provider = GeminiProvider::new(
            api_key,
            "gemini-2.5-flash".to_string(),
            Duration::from_secs(30),
        );

        let passage = provider.fetch_passage().await.unwrap();
        assert!(!passage.is_empty());
        assert!(!passage.contains('\n'));
        println!("Generated passage: {}", passage);
    }
}
