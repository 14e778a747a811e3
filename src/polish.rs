//! Text polisher: optional rewriting of rule-based explanations.
//! Provider abstraction behind a single-method capability trait, injected
//! into the presentation path rather than hard-wired. Every call is bounded
//! by a timeout and fails open: on any error, timeout, or `None` the
//! rule-based text is used unchanged. Failures are logged, never propagated.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scoring::ScoredResult;

/// Scoring context handed to the provider alongside the rule-based text.
#[derive(Debug, Clone, Serialize)]
pub struct PolishContext {
    pub instrument_name: String,
    pub provider: String,
    pub score: f32,
    pub reasons: Vec<String>,
}

impl PolishContext {
    pub fn new(instrument_name: &str, provider: &str, result: &ScoredResult) -> Self {
        Self {
            instrument_name: instrument_name.to_string(),
            provider: provider.to_string(),
            score: result.score,
            reasons: result.reasons.iter().map(|r| r.phrase.clone()).collect(),
        }
    }
}

/// Capability trait consumed by the core: one method, may fail, may be slow.
/// The caller owns the timeout; implementations just do the rewrite.
pub trait TextPolisher: Send + Sync {
    /// Rewrite the explanation, or `None` when unavailable/failed.
    fn polish<'a>(
        &'a self,
        text: &'a str,
        ctx: &'a PolishContext,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynPolisher = Arc<dyn TextPolisher>;

/// Config loaded from `config/polish.json`. Reading/parsing failures fall
/// back to the disabled default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolishConfig {
    pub enabled: bool,
    /// "openai" is the only real provider for now.
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Hard upper bound for one polish call; defaults to 5 seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for PolishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            model: None,
            timeout_secs: Some(5),
        }
    }
}

impl PolishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(5))
    }
}

/// Load config from `config/polish.json`, defaulting to disabled.
pub fn load_polish_config() -> PolishConfig {
    let path = Path::new("config/polish.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => PolishConfig::default(),
    }
}

/// Factory: build a polisher according to config and environment.
///
/// * If `POLISH_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if `config.enabled==false`, returns the disabled polisher.
/// * Else builds the configured provider.
pub fn build_polisher(config: &PolishConfig) -> DynPolisher {
    if std::env::var("POLISH_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockPolisher {
            prefix: "[polished]".to_string(),
        });
    }

    if !config.enabled {
        return Arc::new(DisabledPolisher);
    }

    match config.provider.as_deref() {
        Some("openai") => Arc::new(OpenAiPolisher::new(config.model.as_deref())),
        _ => Arc::new(DisabledPolisher),
    }
}

/// Apply the polisher under its timeout; on any failure return the
/// rule-based text unchanged.
pub async fn polish_or_fallback(
    polisher: &DynPolisher,
    text: &str,
    ctx: &PolishContext,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, polisher.polish(text, ctx)).await {
        Ok(Some(rewritten)) if !rewritten.trim().is_empty() => rewritten,
        Ok(_) => text.to_string(),
        Err(_) => {
            warn!(
                provider = polisher.provider_name(),
                instrument = %ctx.instrument_name,
                "polish call timed out; keeping rule-based text"
            );
            text.to_string()
        }
    }
}

/// Returns `None` always; used when polishing is disabled.
pub struct DisabledPolisher;

impl TextPolisher for DisabledPolisher {
    fn polish<'a>(
        &'a self,
        _text: &'a str,
        _ctx: &'a PolishContext,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic mock for tests and local runs.
pub struct MockPolisher {
    pub prefix: String,
}

impl TextPolisher for MockPolisher {
    fn polish<'a>(
        &'a self,
        text: &'a str,
        _ctx: &'a PolishContext,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = format!("{} {}", self.prefix, text);
        Box::pin(async move { Some(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// OpenAI chat-completions provider. Requires `OPENAI_API_KEY`; without it
/// every call returns `None` and the rule-based text stands.
pub struct OpenAiPolisher {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiPolisher {
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("funding-advisor/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

impl TextPolisher for OpenAiPolisher {
    fn polish<'a>(
        &'a self,
        text: &'a str,
        ctx: &'a PolishContext,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let sys = "You are a funding advisor. Rewrite the given explanation \
                       of why a funding instrument fits a company. Be precise, \
                       concise, and factual; keep it under 90 words; cite why it \
                       fits. Output only the rewritten text.";
            let user = serde_json::json!({
                "explanation": text,
                "instrument": ctx.instrument_name,
                "provider": ctx.provider,
                "score": ctx.score,
                "reasons": ctx.reasons,
            })
            .to_string();

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: sys,
                    },
                    Msg {
                        role: "user",
                        content: &user,
                    },
                ],
                temperature: 0.3,
                max_tokens: 200,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .ok()?;

            if !resp.status().is_success() {
                warn!(status = %resp.status(), "polish provider returned error status");
                return None;
            }
            let body: Resp = resp.json().await.ok()?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.trim())
                .unwrap_or("");
            if content.is_empty() {
                None
            } else {
                Some(content.to_string())
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PolishContext {
        PolishContext {
            instrument_name: "Tempo".into(),
            provider: "Business Finland".into(),
            score: 82.0,
            reasons: vec!["targets your seed stage".into()],
        }
    }

    #[tokio::test]
    async fn disabled_polisher_returns_none() {
        let p = DisabledPolisher;
        assert!(p.polish("text", &ctx()).await.is_none());
    }

    #[tokio::test]
    async fn fallback_keeps_rule_based_text_on_none() {
        let polisher: DynPolisher = Arc::new(DisabledPolisher);
        let out = polish_or_fallback(&polisher, "rule-based", &ctx(), Duration::from_secs(1)).await;
        assert_eq!(out, "rule-based");
    }

    #[tokio::test]
    async fn mock_polisher_rewrites_deterministically() {
        let polisher: DynPolisher = Arc::new(MockPolisher {
            prefix: "[polished]".into(),
        });
        let out = polish_or_fallback(&polisher, "rule-based", &ctx(), Duration::from_secs(1)).await;
        assert_eq!(out, "[polished] rule-based");
    }

    #[test]
    fn config_defaults_to_disabled_with_a_bounded_timeout() {
        let cfg = PolishConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
    }
}
