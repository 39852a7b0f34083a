//! Completion-service strategy.
//!
//! Asks an OpenAI-compatible chat-completions endpoint for the place names in
//! a sentence, then locates each returned name verbatim. Calls are bounded by
//! a semaphore, spaced by a minimum interval, and cached in a bounded LRU by
//! prompt hash. The strategy is [`Locality::Remote`], so the pipeline runs
//! it outside its CPU pool.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use chimei_shared::{AiConfig, Category, ChimeiError, Result, SpanCandidate};
use chimei_strategies::{ExtractionStrategy, Locality, SentenceInput};
use chimei_text::{CharIndex, char_len};

const STRATEGY_NAME: &str = "ai";
const MIN_NAME_CHARS: usize = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

const SYSTEM_PROMPT: &str = "あなたは日本の近代文学に現れる地名を抽出する専門家です。\
与えられた「対象文」に文字どおり現れる地名（都道府県、市区町村、町名、駅、川、山、名所など）だけを挙げてください。\
前後の文は文脈の参考であり、そこにだけ現れる地名は含めないでください。\
人名や一般名詞は含めないでください。\
出力は JSON のみで、形式は {\"places\":[{\"name\":\"地名\",\"confidence\":0.0から1.0の数値}]} とします。\
地名がなければ {\"places\":[]} を返してください。";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// The JSON object the model is asked to produce.
#[derive(Debug, Clone, Deserialize)]
struct PlacesReply {
    #[serde(default)]
    places: Vec<ReplyPlace>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReplyPlace {
    name: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(PlacesReply),
    Transient(String),
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Extraction strategy backed by a completion service.
pub struct AiStrategy {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    min_confidence: f32,
    max_retries: u32,
    min_interval: Duration,
    permits: Arc<Semaphore>,
    last_call: tokio::sync::Mutex<Option<Instant>>,
    cache: Mutex<LruCache<String, PlacesReply>>,
}

impl std::fmt::Debug for AiStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiStrategy")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("min_confidence", &self.min_confidence)
            .finish_non_exhaustive()
    }
}

impl AiStrategy {
    /// Build the strategy. Fails on an unparsable `base_url`.
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self> {
        let base = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join("chat/completions"))
            .map_err(|e| {
                ChimeiError::config(format!("invalid ai.base_url {:?}: {e}", config.base_url))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChimeiError::Ai(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
            min_confidence: config.min_confidence,
            max_retries: config.max_retries,
            min_interval: Duration::from_millis(config.min_interval_ms),
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            last_call: tokio::sync::Mutex::new(None),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(config.cache_entries.max(1)).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// Number of cached replies.
    pub fn cached_replies(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn ask(&self, prompt: &str) -> Result<PlacesReply> {
        let key = prompt_hash(&self.model, prompt);
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(hit) = cached {
            debug!(hash = %key, "ai cache hit");
            return Ok(hit);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ChimeiError::Ai(format!("request limiter closed: {e}")))?;

        let mut attempt = 0;
        let reply = loop {
            self.pace().await;
            match self.send(prompt).await? {
                Attempt::Done(reply) => break reply,
                Attempt::Transient(reason) if attempt < self.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    warn!(attempt, ?delay, %reason, "ai request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Attempt::Transient(reason) => {
                    return Err(ChimeiError::Ai(format!(
                        "giving up after {} attempts: {reason}",
                        attempt + 1
                    )));
                }
            }
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, reply.clone());
        Ok(reply)
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// request started.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn send(&self, prompt: &str) -> Result<Attempt> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = match self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Transient(format!("network error: {e}"))),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Ok(Attempt::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(ChimeiError::Ai(format!("completion service returned HTTP {status}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChimeiError::Ai(format!("invalid completion response: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChimeiError::Ai("completion response has no content".into()))?;

        parse_reply(&content).map(Attempt::Done)
    }

    /// Turn a reply into candidates: every verbatim occurrence of every
    /// acceptable name.
    fn locate(&self, input: &SentenceInput<'_>, reply: PlacesReply) -> Result<Vec<SpanCandidate>> {
        let chars = CharIndex::new(input.text);
        let default_confidence = Category::AiExtracted.default_confidence().get();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for place in reply.places {
            let name = place.name.trim();
            let confidence = place.confidence.unwrap_or(default_confidence);
            if char_len(name) < MIN_NAME_CHARS || confidence < self.min_confidence {
                continue;
            }
            if !seen.insert(name.to_string()) {
                continue;
            }

            let before = candidates.len();
            for (byte, _) in input.text.match_indices(name) {
                let start = chars.char_offset(byte);
                let candidate = SpanCandidate::new(
                    input.index,
                    name,
                    start,
                    start + char_len(name),
                    Category::AiExtracted,
                    STRATEGY_NAME,
                )?
                .with_confidence(confidence);
                candidates.push(candidate);
            }
            if candidates.len() == before {
                debug!(name, sentence = input.index, "ai name not found verbatim, dropped");
            }
        }

        Ok(candidates)
    }
}

#[async_trait]
impl ExtractionStrategy for AiStrategy {
    fn name(&self) -> &str {
        STRATEGY_NAME
    }

    fn locality(&self) -> Locality {
        Locality::Remote
    }

    async fn extract(&self, input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
        let prompt = build_prompt(input);
        let reply = self.ask(&prompt).await?;
        self.locate(input, reply)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_prompt(input: &SentenceInput<'_>) -> String {
    let mut prompt = String::new();
    if let Some(previous) = input.previous {
        prompt.push_str(&format!("前の文: {previous}\n"));
    }
    prompt.push_str(&format!("対象文: {}\n", input.text));
    if let Some(next) = input.next {
        prompt.push_str(&format!("次の文: {next}\n"));
    }
    prompt
}

/// Parse the model's JSON, tolerating a surrounding code fence.
fn parse_reply(content: &str) -> Result<PlacesReply> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim())
        .map_err(|e| ChimeiError::Ai(format!("unparsable model output: {e}")))
}

fn prompt_hash(model: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0]);
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}
