// Test doubles shared by the store, backup and state tests

use crate::db::MemoryStorage;
use crate::secrets::transport::{ChatTransport, TransportResponse};
use crate::secrets::CredentialStore;
use crate::types::CredentialDraft;
use crate::utils::{Codec, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One recorded outbound call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub bearer: String,
    pub body: Value,
}

/// Transport answering every call with a fixed status and body
pub struct StubTransport {
    status: u16,
    body: String,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(
            200,
            r#"{"choices":[{"message":{"content":"pong"}}],"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}"#,
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for StubTransport {
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            bearer: bearer.to_string(),
            body: body.clone(),
        });
        Ok(TransportResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

pub fn test_codec() -> Arc<Codec> {
    Arc::new(Codec::from_passphrase("keydeck-test"))
}

/// Store over fresh in-memory storage
pub fn memory_store(transport: Arc<StubTransport>) -> (Arc<MemoryStorage>, CredentialStore) {
    let storage = Arc::new(MemoryStorage::new());
    let store = CredentialStore::new(storage.clone(), test_codec(), transport);
    (storage, store)
}

pub fn draft(name: &str, url: &str, key: &str) -> CredentialDraft {
    CredentialDraft {
        name: Some(name.to_string()),
        endpoint_url: Some(url.to_string()),
        secret_key: Some(key.to_string()),
        ..CredentialDraft::default()
    }
}
