// Create/update/delete/test operations tracked by the coordinator

use crate::secrets::CredentialStore;
use crate::state::list::ListController;
use crate::state::RequestStateCoordinator;
use crate::types::{CredentialDraft, CredentialRecord, DeletedCredential, TestOutcome, TestRequest};
use crate::utils::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CREATE_KEY: &str = "create";
pub const BATCH_DELETE_KEY: &str = "batch-delete";

pub fn update_key(id: &str) -> String {
    format!("update-{}", id)
}

pub fn delete_key(id: &str) -> String {
    format!("delete-{}", id)
}

pub fn detail_key(id: &str) -> String {
    format!("detail-{}", id)
}

pub fn test_key(id: &str) -> String {
    format!("test-{}", id)
}

/// Runs store operations under their request keys and keeps the list view
/// current after each successful mutation
#[derive(Clone)]
pub struct CrudController {
    store: Arc<CredentialStore>,
    coordinator: RequestStateCoordinator,
    list: Arc<Mutex<ListController>>,
}

impl CrudController {
    pub fn new(
        store: Arc<CredentialStore>,
        coordinator: RequestStateCoordinator,
        list: Arc<Mutex<ListController>>,
    ) -> Self {
        Self {
            store,
            coordinator,
            list,
        }
    }

    pub fn coordinator(&self) -> &RequestStateCoordinator {
        &self.coordinator
    }

    pub async fn create(&self, draft: CredentialDraft) -> Result<CredentialRecord> {
        let store = Arc::clone(&self.store);
        let record = self
            .coordinator
            .wrap(CREATE_KEY, || async move { store.add(draft) })
            .await?;

        log::info!("Created credential {} ({})", record.name, record.id);
        self.refresh_list().await;
        Ok(record)
    }

    pub async fn update(&self, id: &str, draft: CredentialDraft) -> Result<CredentialRecord> {
        let store = Arc::clone(&self.store);
        let record = self
            .coordinator
            .wrap(update_key(id), || async move { store.update(id, draft) })
            .await?;

        self.refresh_list().await;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<DeletedCredential> {
        let store = Arc::clone(&self.store);
        let deleted = self
            .coordinator
            .wrap(delete_key(id), || async move { store.delete(id) })
            .await?;

        log::info!("Deleted credential {} ({})", deleted.name, deleted.id);
        self.refresh_list().await;
        Ok(deleted)
    }

    pub async fn batch_delete(&self, ids: &[String]) -> Result<Vec<DeletedCredential>> {
        let store = Arc::clone(&self.store);
        let deleted = self
            .coordinator
            .wrap(BATCH_DELETE_KEY, || async move { store.delete_many(ids) })
            .await?;

        log::info!("Deleted {} credential(s)", deleted.len());
        self.refresh_list().await;
        Ok(deleted)
    }

    /// Single record by id, tracked but without touching the list
    pub async fn detail(&self, id: &str) -> Result<CredentialRecord> {
        let store = Arc::clone(&self.store);
        self.coordinator
            .wrap(detail_key(id), || async move { store.get(id) })
            .await
    }

    /// Test a credential; a success bumps its counters so the list refreshes
    pub async fn test(&self, id: &str, request: &TestRequest) -> Result<TestOutcome> {
        let store = Arc::clone(&self.store);
        let outcome = self
            .coordinator
            .wrap(test_key(id), || async move { store.test(id, request).await })
            .await?;

        self.refresh_list().await;
        Ok(outcome)
    }

    /// A refresh failure never turns a completed mutation into an error
    async fn refresh_list(&self) {
        if let Err(e) = self.list.lock().await.refresh().await {
            log::warn!("List refresh after mutation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::testing::{draft, memory_store, StubTransport};
    use crate::utils::KeydeckError;
    use pretty_assertions::assert_eq;

    fn controller(transport: StubTransport) -> (CrudController, Arc<Mutex<ListController>>) {
        let (_storage, store) = memory_store(Arc::new(transport));
        let store = Arc::new(store);
        let coordinator = RequestStateCoordinator::new();
        let list = Arc::new(Mutex::new(ListController::new(
            store.clone(),
            coordinator.clone(),
        )));
        (CrudController::new(store, coordinator, list.clone()), list)
    }

    #[tokio::test]
    async fn test_create_refreshes_list() {
        let (crud, list) = controller(StubTransport::ok());

        let record = crud.create(draft("Prod", "https://api.x.com/", "sk-1")).await.unwrap();

        let list = list.lock().await;
        assert_eq!(list.total(), 1);
        assert_eq!(list.items()[0].id, record.id);
        assert!(!crud.coordinator().is_loading(CREATE_KEY));
    }

    #[tokio::test]
    async fn test_create_failure_sets_error_and_skips_refresh() {
        let (crud, list) = controller(StubTransport::ok());

        let result = crud.create(draft("", "https://x", "k")).await;

        assert!(matches!(result, Err(KeydeckError::Validation { .. })));
        assert_eq!(
            crud.coordinator().last_error().as_deref(),
            Some("Invalid name: is required")
        );
        assert_eq!(list.lock().await.total(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_use_id_keys() {
        let (crud, list) = controller(StubTransport::ok());
        let record = crud.create(draft("A", "https://x", "k")).await.unwrap();

        let updated = crud
            .update(
                &record.id,
                CredentialDraft {
                    name: Some("B".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "B");
        assert_eq!(list.lock().await.items()[0].name, "B");

        let state = crud.coordinator().snapshot();
        assert_eq!(state.loading.get(&update_key(&record.id)), Some(&false));

        crud.delete(&record.id).await.unwrap();
        assert_eq!(list.lock().await.total(), 0);
        assert_eq!(
            crud.coordinator().snapshot().loading.get(&delete_key(&record.id)),
            Some(&false)
        );
    }

    #[tokio::test]
    async fn test_delete_missing_reports_not_found() {
        let (crud, _list) = controller(StubTransport::ok());

        let result = crud.delete("nope").await;

        assert!(matches!(result, Err(KeydeckError::NotFound(_))));
        assert_eq!(
            crud.coordinator().last_error().as_deref(),
            Some("Credential not found: nope")
        );
    }

    #[tokio::test]
    async fn test_batch_delete_removes_all() {
        let (crud, list) = controller(StubTransport::ok());
        let a = crud.create(draft("A", "https://x", "k")).await.unwrap();
        let b = crud.create(draft("B", "https://x", "k")).await.unwrap();
        crud.create(draft("C", "https://x", "k")).await.unwrap();

        let deleted = crud.batch_delete(&[a.id, b.id]).await.unwrap();

        assert_eq!(deleted.len(), 2);
        let list = list.lock().await;
        assert_eq!(list.total(), 1);
        assert_eq!(list.items()[0].name, "C");
    }

    #[tokio::test]
    async fn test_test_bumps_counters_in_list() {
        let (crud, list) = controller(StubTransport::ok());
        let record = crud.create(draft("A", "https://x", "k")).await.unwrap();

        let outcome = crud.test(&record.id, &TestRequest::new("ping")).await.unwrap();

        assert_eq!(outcome.content.as_deref(), Some("pong"));
        let list = list.lock().await;
        assert_eq!(list.items()[0].test_count, 1);
        assert_eq!(list.recent_activities().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_error_message_is_extracted() {
        let (crud, _list) = controller(StubTransport::new(
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        ));
        let record = crud.create(draft("A", "https://x", "k")).await.unwrap();

        let result = crud.test(&record.id, &TestRequest::new("ping")).await;

        assert!(matches!(result, Err(KeydeckError::RemoteApi { status: 401, .. })));
        assert_eq!(
            crud.coordinator().last_error().as_deref(),
            Some("Incorrect API key provided")
        );
        assert_eq!(crud.detail(&record.id).await.unwrap().test_count, 0);
    }
}
