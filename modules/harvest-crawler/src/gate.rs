use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use harvest_common::Config;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::traits::RelevanceGate;

/// Pick the gate the configuration asks for: a classifier service if
/// `CLASSIFIER_URL` is set, else keywords if any, else accept everything.
pub fn from_config(config: &Config) -> Result<Arc<dyn RelevanceGate>> {
    let gate: Arc<dyn RelevanceGate> = if let Some(url) = &config.classifier_url {
        Arc::new(HttpGate::new(url)?)
    } else if !config.relevance_keywords.is_empty() {
        Arc::new(KeywordGate::new(&config.relevance_keywords)?)
    } else {
        Arc::new(AcceptAll)
    };
    info!(gate = gate.name(), "Relevance gate selected");
    Ok(gate)
}

/// Every comment with text is relevant.
pub struct AcceptAll;

#[async_trait]
impl RelevanceGate for AcceptAll {
    async fn classify(&self, _text: &str) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "accept_all"
    }
}

/// Case-insensitive whole-word match against a keyword list.
pub struct KeywordGate {
    pattern: Regex,
}

impl KeywordGate {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            anyhow::bail!("keyword gate needs at least one keyword");
        }
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
            .context("Failed to compile keyword pattern")?;
        Ok(Self { pattern })
    }
}

#[async_trait]
impl RelevanceGate for KeywordGate {
    async fn classify(&self, text: &str) -> Result<bool> {
        Ok(self.pattern.is_match(text))
    }

    fn name(&self) -> &str {
        "keywords"
    }
}

/// Remote classifier: `POST {"text": ...}` → `{"relevant": bool}`.
pub struct HttpGate {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    relevant: bool,
}

impl HttpGate {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build classifier HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RelevanceGate for HttpGate {
    async fn classify(&self, text: &str) -> Result<bool> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { text })
            .send()
            .await
            .context("Classifier request failed")?
            .error_for_status()
            .context("Classifier returned an error status")?;

        let body: ClassifyResponse = resp
            .json()
            .await
            .context("Failed to parse classifier response")?;
        Ok(body.relevant)
    }

    fn name(&self) -> &str {
        "http"
    }
}
