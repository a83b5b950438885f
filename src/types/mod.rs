// Core type definitions for Keydeck

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Provider family of a credential
///
/// Unknown values read from storage are kept verbatim so newer data survives
/// a round trip through an older binary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    #[default]
    OpenAiCompatible,
    AnthropicCompatible,
    Custom,
    Other(String),
}

impl ProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderType::OpenAiCompatible => "openai-compatible",
            ProviderType::AnthropicCompatible => "anthropic-compatible",
            ProviderType::Custom => "custom",
            ProviderType::Other(raw) => raw,
        }
    }

    /// Human readable label
    pub fn display_name(&self) -> &str {
        match self {
            ProviderType::OpenAiCompatible => "OpenAI Compatible",
            ProviderType::AnthropicCompatible => "Anthropic Claude",
            ProviderType::Custom => "Custom",
            ProviderType::Other(raw) => raw,
        }
    }
}

impl From<String> for ProviderType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "openai-compatible" | "openai" => ProviderType::OpenAiCompatible,
            "anthropic-compatible" | "anthropic" => ProviderType::AnthropicCompatible,
            "custom" => ProviderType::Custom,
            _ => ProviderType::Other(raw),
        }
    }
}

impl From<&str> for ProviderType {
    fn from(raw: &str) -> Self {
        ProviderType::from(raw.to_string())
    }
}

impl From<ProviderType> for String {
    fn from(provider: ProviderType) -> Self {
        match provider {
            ProviderType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a credential is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    #[default]
    Active,
    Inactive,
}

impl CredentialStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "active" => Some(CredentialStatus::Active),
            "inactive" => Some(CredentialStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStatus::Active => f.write_str("active"),
            CredentialStatus::Inactive => f.write_str("inactive"),
        }
    }
}

/// One stored API endpoint + key + metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Opaque identifier, assigned at creation
    pub id: String,

    pub name: String,

    /// Base URL without trailing slash
    pub endpoint_url: String,

    pub secret_key: String,

    #[serde(default)]
    pub provider_type: ProviderType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: CredentialStatus,

    pub created_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tested_at: Option<String>,

    #[serde(default)]
    pub test_count: u64,
}

impl CredentialRecord {
    /// Secret rendered for summaries: presence only
    pub fn masked_secret(&self) -> &'static str {
        if self.secret_key.is_empty() {
            "<missing>"
        } else {
            "<set>"
        }
    }

    /// Case-insensitive free-text match used by searches
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.name.to_lowercase().contains(&query)
            || self.endpoint_url.to_lowercase().contains(&query)
            || self.provider_type.as_str().to_lowercase().contains(&query)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

/// Caller-supplied fields for add/update
///
/// `None` means "not provided": add rejects missing required fields, update
/// keeps the existing value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDraft {
    pub name: Option<String>,
    pub endpoint_url: Option<String>,
    pub secret_key: Option<String>,
    pub provider_type: Option<ProviderType>,
    pub description: Option<String>,
    pub status: Option<CredentialStatus>,
}

/// Aggregate counts over the whole record set
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub total_tests: u64,
}

impl Stats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CredentialRecord>) -> Self {
        let mut stats = Stats::default();
        for record in records {
            stats.total += 1;
            match record.status {
                CredentialStatus::Active => stats.active += 1,
                CredentialStatus::Inactive => stats.inactive += 1,
            }
            stats.total_tests += record.test_count;
        }
        stats
    }
}

/// Default page size for list views
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page request against the record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
    pub search: String,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
        }
    }
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<CredentialRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Identity of a removed record, for confirmation messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedCredential {
    pub id: String,
    pub name: String,
}

/// Default model for credential tests
pub const DEFAULT_TEST_MODEL: &str = "gpt-3.5-turbo";

/// Default sampling temperature for credential tests
pub const DEFAULT_TEST_TEMPERATURE: f64 = 0.7;

/// Upper bound on generated tokens for credential tests
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Parameters of a credential test call
#[derive(Debug, Clone, PartialEq)]
pub struct TestRequest {
    pub message: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl TestRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: DEFAULT_TEST_MODEL.to_string(),
            temperature: DEFAULT_TEST_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Chat-completions request body
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": self.message }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Result of a successful credential test
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    /// Provider payload, unmodified
    pub response: Value,
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
    /// Set when the payload has no `choices`
    pub unexpected_format: bool,
}

impl TestOutcome {
    pub fn from_response(response: Value) -> Self {
        let first_choice = response
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first());

        let content = first_choice
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let usage = response.get("usage").filter(|u| u.is_object()).map(|u| TokenUsage {
            prompt_tokens: u.get("prompt_tokens").and_then(Value::as_u64),
            completion_tokens: u.get("completion_tokens").and_then(Value::as_u64),
            total_tokens: u.get("total_tokens").and_then(Value::as_u64),
        });

        Self {
            unexpected_format: first_choice.is_none(),
            response,
            content,
            usage,
        }
    }
}
