//! HTTP client for a running eatthis server.
//!
//! Failures never propagate as errors: every call yields a [`Fetched`] with
//! whatever items were obtained (none on failure) and a message to show.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use eatthis_core::filters::rank_cards;
use eatthis_core::models::{IngredientSuggestion, RecipeCard};
use eatthis_core::service::MIN_AUTOCOMPLETE_CHARS;

pub const CLIENT_AUTOCOMPLETE_LIMIT: usize = 10;
pub const AUTOCOMPLETE_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Fetched<T> {
    fn ok(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    fn failed(err: &anyhow::Error) -> Self {
        Self {
            items: Vec::new(),
            error: Some(format!("{err:#}")),
        }
    }

    pub fn into_result(self) -> Result<Vec<T>, String> {
        match self.error {
            Some(message) => Err(message),
            None => Ok(self.items),
        }
    }
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "eatthis-cli/{} (recipe finder)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Suggestions for `query`. Queries under two characters return nothing
    /// without a request.
    pub async fn autocomplete(&self, query: &str) -> Fetched<IngredientSuggestion> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_AUTOCOMPLETE_CHARS {
            return Fetched::ok(Vec::new());
        }
        match self.fetch_suggestions(trimmed).await {
            Ok(items) => Fetched::ok(items),
            Err(e) => {
                warn!("autocomplete failed: {e:#}");
                Fetched::failed(&e)
            }
        }
    }

    /// Ranked cards, re-sorted locally whatever order the server used.
    pub async fn search(&self, ingredients: &[String], limit: usize) -> Fetched<RecipeCard> {
        match self.fetch_cards(ingredients, limit).await {
            Ok(mut cards) => {
                rank_cards(&mut cards);
                Fetched::ok(cards)
            }
            Err(e) => {
                warn!("search failed: {e:#}");
                Fetched::failed(&e)
            }
        }
    }

    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<IngredientSuggestion>> {
        let limit = CLIENT_AUTOCOMPLETE_LIMIT.to_string();
        let resp = self
            .client
            .get(format!("{}/api/autocomplete", self.base_url))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await
            .context("Failed to reach eatthis server")?;
        let body = read_json(resp).await?;
        array_field(body, "suggestions")
    }

    async fn fetch_cards(&self, ingredients: &[String], limit: usize) -> Result<Vec<RecipeCard>> {
        debug!(?ingredients, limit, "remote search");
        let resp = self
            .client
            .post(format!("{}/api/search", self.base_url))
            .json(&serde_json::json!({ "ingredients": ingredients, "limit": limit }))
            .send()
            .await
            .context("Failed to reach eatthis server")?;
        let body = read_json(resp).await?;
        array_field(body, "results")
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .with_context(|| format!("Failed to parse server response (HTTP {status})"))?;
    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        bail!("Server returned HTTP {status}: {message}");
    }
    Ok(body)
}

fn array_field<T: DeserializeOwned>(mut body: Value, field: &str) -> Result<Vec<T>> {
    let items = body
        .get_mut(field)
        .map(Value::take)
        .filter(Value::is_array)
        .ok_or_else(|| anyhow!("Invalid response format: '{field}' is not an array"))?;
    serde_json::from_value(items).with_context(|| format!("Invalid entries in '{field}'"))
}

// --- Debouncing ---

/// Trailing-edge debouncer: a value settles only if no newer value arrives
/// within the delay. Clones share the same window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Waits out the delay, then yields `value` unless it was superseded.
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        (self.latest.load(Ordering::SeqCst) == ticket).then_some(value)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(AUTOCOMPLETE_DEBOUNCE)
    }
}
