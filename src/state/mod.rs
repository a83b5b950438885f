// Request-state tracking for asynchronous operations
//
// Each operation runs under a string key ("list", "delete-42", ...). The
// coordinator keeps one in-flight flag per key and a single shared last
// error, published through a watch channel for whatever renders them.

pub mod crud;
pub mod list;
pub mod sync;

use crate::utils::{KeydeckError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Message used when an error carries no text of its own
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Observable coordinator state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub loading: HashMap<String, bool>,
    pub last_error: Option<String>,
}

/// Tracks in-flight operations by key
///
/// Two `wrap` calls with the same key run concurrently and each clears the
/// flag when it finishes. Callers that need at most one in flight per key
/// must check [`RequestStateCoordinator::is_loading`] before starting.
#[derive(Clone)]
pub struct RequestStateCoordinator {
    state: Arc<watch::Sender<OperationState>>,
}

impl RequestStateCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(OperationState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Run `operation` under `key`
    ///
    /// The flag for `key` is set for the whole call and cleared on every
    /// exit: success, error, or the returned future being dropped. Errors are
    /// recorded as the last error and returned unchanged.
    pub async fn wrap<T, F, Fut>(&self, key: impl Into<String>, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = key.into();
        self.state.send_modify(|state| {
            state.loading.insert(key.clone(), true);
            state.last_error = None;
        });
        let _guard = LoadingGuard {
            state: &self.state,
            key: &key,
        };

        match operation().await {
            Ok(value) => Ok(value),
            Err(err) => {
                let message = error_message(&err);
                log::error!("Error during [{}]: {}", key, err);
                self.state
                    .send_modify(|state| state.last_error = Some(message));
                Err(err)
            }
        }
    }

    /// False for keys never seen
    pub fn is_loading(&self, key: &str) -> bool {
        self.state.borrow().loading.get(key).copied().unwrap_or(false)
    }

    pub fn any_loading(&self) -> bool {
        self.state.borrow().loading.values().any(|loading| *loading)
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.last_error = None);
    }

    pub fn snapshot(&self) -> OperationState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }
}

impl Default for RequestStateCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

struct LoadingGuard<'a> {
    state: &'a watch::Sender<OperationState>,
    key: &'a str,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| {
            state.loading.insert(self.key.to_string(), false);
        });
    }
}

/// Human-readable message for an operation failure
///
/// A remote error body's `error` field wins (string, or object with
/// `message`), then the error's own text, then a generic message.
pub fn error_message(err: &KeydeckError) -> String {
    let message = match err {
        KeydeckError::RemoteApi { body, .. } => {
            remote_error_field(body).unwrap_or_else(|| err.to_string())
        }
        other => other.to_string(),
    };

    if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

fn remote_error_field(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = match value.get("error")? {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields.get("message")?.as_str()?.to_string(),
        _ => return None,
    };
    Some(message).filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_flag_is_set_only_during_the_call() {
        let coordinator = RequestStateCoordinator::new();
        assert!(!coordinator.is_loading("list"));

        let inner = coordinator.clone();
        let seen = coordinator
            .wrap("list", || async move { Ok(inner.is_loading("list")) })
            .await
            .unwrap();

        assert!(seen);
        assert!(!coordinator.is_loading("list"));
        assert_eq!(coordinator.last_error(), None);
    }

    #[tokio::test]
    async fn test_failure_records_message_and_clears_flag() {
        let coordinator = RequestStateCoordinator::new();

        let result: Result<()> = coordinator
            .wrap("delete-42", || async { Err(KeydeckError::NotFound("42".to_string())) })
            .await;

        assert!(matches!(result, Err(KeydeckError::NotFound(_))));
        assert!(!coordinator.is_loading("delete-42"));
        assert_eq!(coordinator.last_error().as_deref(), Some("Credential not found: 42"));
    }

    #[tokio::test]
    async fn test_immediate_error_clears_flag() {
        let coordinator = RequestStateCoordinator::new();

        let result: Result<()> = coordinator
            .wrap("create", || std::future::ready(Err(KeydeckError::validation("name", "is required"))))
            .await;

        assert!(result.is_err());
        assert!(!coordinator.is_loading("create"));
    }

    #[tokio::test]
    async fn test_dropped_operation_clears_flag() {
        let coordinator = RequestStateCoordinator::new();

        let pending = coordinator.wrap("test-1", || std::future::pending::<Result<()>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert!(timed_out.is_err());
        assert!(!coordinator.is_loading("test-1"));
    }

    #[tokio::test]
    async fn test_new_call_clears_previous_error() {
        let coordinator = RequestStateCoordinator::new();
        let _ = coordinator
            .wrap("a", || async { Err::<(), _>(KeydeckError::Unknown("boom".to_string())) })
            .await;
        assert!(coordinator.last_error().is_some());

        coordinator.wrap("b", || async { Ok(()) }).await.unwrap();
        assert_eq!(coordinator.last_error(), None);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let coordinator = RequestStateCoordinator::new();
        let inner = coordinator.clone();

        coordinator
            .wrap("outer", || async move {
                inner
                    .wrap("inner", || async {
                        Ok(())
                    })
                    .await?;
                assert!(inner.is_loading("outer"));
                assert!(!inner.is_loading("inner"));
                Ok(())
            })
            .await
            .unwrap();

        assert!(!coordinator.any_loading());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let coordinator = RequestStateCoordinator::new();
        let mut changes = coordinator.subscribe();

        coordinator.wrap("list", || async { Ok(()) }).await.unwrap();

        assert!(changes.has_changed().unwrap());
        let state = changes.borrow_and_update().clone();
        assert_eq!(state.loading.get("list"), Some(&false));
    }

    #[test]
    fn test_error_message_prefers_remote_field() {
        let nested = KeydeckError::RemoteApi {
            status: 401,
            body: r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string(),
        };
        assert_eq!(error_message(&nested), "Incorrect API key provided");

        let flat = KeydeckError::RemoteApi {
            status: 429,
            body: r#"{"error":"rate limited"}"#.to_string(),
        };
        assert_eq!(error_message(&flat), "rate limited");

        let raw = KeydeckError::RemoteApi {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(error_message(&raw), "Remote API returned HTTP 502: Bad Gateway");

        let empty_field = KeydeckError::RemoteApi {
            status: 400,
            body: r#"{"error":""}"#.to_string(),
        };
        assert_eq!(error_message(&empty_field), "Remote API returned HTTP 400: {\"error\":\"\"}");
    }
}
