// Credential store (CRUD operations over the encrypted record set)

pub mod transport;

#[cfg(test)]
pub mod testing;

use crate::config::APIS_KEY;
use crate::db::KeyValueStorage;
use crate::types::{
    CredentialDraft, CredentialRecord, DeletedCredential, Page, PageQuery, Stats, TestOutcome,
    TestRequest, DEFAULT_PAGE_SIZE,
};
use crate::utils::{
    normalize_endpoint_url, require_non_empty, validate_url, Codec, KeydeckError, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use transport::ChatTransport;

/// Outcome of [`CredentialStore::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub count: usize,
    /// Set when stored data could not be decoded and was discarded
    pub warning: Option<String>,
}

/// Read access to pages of credentials
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page>;
}

/// Owner of the in-memory record set
///
/// Every mutation re-encrypts the full set and writes it under [`APIS_KEY`]
/// before returning. A failed write is reported, but the in-memory change
/// stays; the next successful write or `load` reconciles the two.
pub struct CredentialStore {
    records: Mutex<Vec<CredentialRecord>>,
    storage: Arc<dyn KeyValueStorage>,
    codec: Arc<Codec>,
    transport: Arc<dyn ChatTransport>,
    revision: watch::Sender<u64>,
}

impl CredentialStore {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        codec: Arc<Codec>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            records: Mutex::new(Vec::new()),
            storage,
            codec,
            transport,
            revision,
        }
    }

    /// Replace the in-memory set with the persisted one
    pub fn load(&self) -> Result<LoadReport> {
        let (records, warning) = match self.storage.get(APIS_KEY)? {
            None => (Vec::new(), None),
            Some(raw) => match self.codec.decrypt::<Vec<CredentialRecord>>(&raw) {
                Ok(records) => (records, None),
                Err(e) => {
                    let warning = format!(
                        "Stored credentials could not be read and were reset to an empty list ({})",
                        e
                    );
                    log::warn!("{}", warning);
                    (Vec::new(), Some(warning))
                }
            },
        };

        let count = records.len();
        *self.lock_records()? = records;
        self.notify();

        log::debug!("Loaded {} credential(s)", count);
        Ok(LoadReport { count, warning })
    }

    /// Snapshot of all records
    pub fn records(&self) -> Result<Vec<CredentialRecord>> {
        Ok(self.lock_records()?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_records()?.len())
    }

    pub fn get(&self, id: &str) -> Result<CredentialRecord> {
        self.lock_records()?
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| KeydeckError::NotFound(id.to_string()))
    }

    /// Find a record id from an id or an unambiguous name
    pub fn resolve(&self, id_or_name: &str) -> Result<String> {
        let records = self.lock_records()?;
        if records.iter().any(|r| r.id == id_or_name) {
            return Ok(id_or_name.to_string());
        }

        let by_name: Vec<&CredentialRecord> = records
            .iter()
            .filter(|r| r.name.eq_ignore_ascii_case(id_or_name))
            .collect();

        match by_name.as_slice() {
            [single] => Ok(single.id.clone()),
            [] => Err(KeydeckError::NotFound(id_or_name.to_string())),
            many => Err(KeydeckError::InvalidArgument(format!(
                "'{}' matches {} credentials; use the id instead",
                id_or_name,
                many.len()
            ))),
        }
    }

    /// Validate, normalize and append a new record
    pub fn add(&self, draft: CredentialDraft) -> Result<CredentialRecord> {
        let name = required(draft.name.as_deref(), "name")?;
        let endpoint_url = required(draft.endpoint_url.as_deref(), "endpointUrl")?;
        let secret_key = required(draft.secret_key.as_deref(), "secretKey")?;
        validate_url("endpointUrl", &endpoint_url)?;

        let record = CredentialRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            endpoint_url: normalize_endpoint_url(&endpoint_url),
            secret_key,
            provider_type: draft.provider_type.unwrap_or_default(),
            description: clean_description(draft.description),
            status: draft.status.unwrap_or_default(),
            created_at: now(),
            updated_at: None,
            last_tested_at: None,
            test_count: 0,
        };

        self.mutate(|records| {
            records.push(record.clone());
            Ok(record)
        })
    }

    /// Merge `draft` onto an existing record
    pub fn update(&self, id: &str, draft: CredentialDraft) -> Result<CredentialRecord> {
        self.mutate(|records| {
            let index = position(records, id)?;

            let mut merged = records[index].clone();
            merge_draft(&mut merged, draft)?;
            merged.updated_at = Some(now());

            records[index] = merged.clone();
            Ok(merged)
        })
    }

    pub fn delete(&self, id: &str) -> Result<DeletedCredential> {
        self.mutate(|records| {
            let index = position(records, id)?;
            let removed = records.remove(index);
            Ok(DeletedCredential {
                id: removed.id,
                name: removed.name,
            })
        })
    }

    /// Remove several records with a single write; all ids must exist
    pub fn delete_many(&self, ids: &[String]) -> Result<Vec<DeletedCredential>> {
        if ids.is_empty() {
            return Err(KeydeckError::validation("ids", "at least one id is required"));
        }

        self.mutate(|records| {
            if let Some(missing) = ids.iter().find(|id| !records.iter().any(|r| &r.id == *id)) {
                return Err(KeydeckError::NotFound(missing.clone()));
            }

            let mut removed = Vec::new();
            records.retain(|r| {
                if ids.contains(&r.id) {
                    removed.push(DeletedCredential {
                        id: r.id.clone(),
                        name: r.name.clone(),
                    });
                    false
                } else {
                    true
                }
            });
            Ok(removed)
        })
    }

    /// Call `<endpointUrl>/chat/completions` with the stored key
    ///
    /// Only a successful, parseable answer bumps `testCount` and
    /// `lastTestedAt`.
    pub async fn test(&self, id: &str, request: &TestRequest) -> Result<TestOutcome> {
        require_non_empty("message", &request.message)?;
        let record = self.get(id)?;

        let url = format!("{}/chat/completions", record.endpoint_url);
        let response = self
            .transport
            .post_json(&url, &record.secret_key, &request.to_body())
            .await?;

        if !response.is_success() {
            return Err(KeydeckError::RemoteApi {
                status: response.status,
                body: response.body,
            });
        }

        let payload: Value =
            serde_json::from_str(&response.body).map_err(|e| KeydeckError::RemoteApi {
                status: response.status,
                body: format!("unparseable response ({}): {}", e, response.body),
            })?;

        let stamped = self.mutate(|records| {
            Ok(match records.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    record.test_count += 1;
                    record.last_tested_at = Some(now());
                    true
                }
                None => false,
            })
        })?;

        if !stamped {
            log::warn!("Credential {} was removed while its test was in flight", id);
        }

        Ok(TestOutcome::from_response(payload))
    }

    /// Counts over the full set, computed on every call
    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats::from_records(self.lock_records()?.iter()))
    }

    /// One page of records matching `query.search`
    pub fn page(&self, query: &PageQuery) -> Result<Page> {
        let records = self.lock_records()?;
        let page = query.page.max(1);
        let page_size = if query.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.page_size
        };

        let matching: Vec<&CredentialRecord> = records
            .iter()
            .filter(|r| r.matches(&query.search))
            .collect();

        let items = matching
            .iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .map(|r| (*r).clone())
            .collect();

        Ok(Page {
            items,
            total: matching.len(),
            page,
            page_size,
        })
    }

    /// Revision counter, bumped on every in-memory change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn lock_records(&self) -> Result<MutexGuard<'_, Vec<CredentialRecord>>> {
        self.records
            .lock()
            .map_err(|e| KeydeckError::Unknown(e.to_string()))
    }

    /// Apply `change` and persist the whole set
    ///
    /// `change` must return its precondition errors before touching the set.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<CredentialRecord>) -> Result<T>,
    ) -> Result<T> {
        let mut records = self.lock_records()?;
        let value = change(&mut records)?;
        let persisted = self.persist(&records);
        drop(records);

        self.notify();
        persisted.map(|_| value)
    }

    fn persist(&self, records: &[CredentialRecord]) -> Result<()> {
        let sealed = self.codec.encrypt(records)?;
        self.storage.set(APIS_KEY, &sealed).map_err(|e| {
            log::error!("Failed to persist {} credential(s): {}", records.len(), e);
            e
        })
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

#[async_trait]
impl CredentialSource for CredentialStore {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page> {
        self.page(query)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn required(value: Option<&str>, field: &str) -> Result<String> {
    let value = value.unwrap_or_default();
    require_non_empty(field, value)?;
    Ok(value.trim().to_string())
}

fn position(records: &[CredentialRecord], id: &str) -> Result<usize> {
    records
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| KeydeckError::NotFound(id.to_string()))
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Field-by-field merge of the editable fields
///
/// `id`, `createdAt`, `lastTestedAt` and `testCount` are never taken from
/// caller input. The merged record is validated as a whole.
fn merge_draft(record: &mut CredentialRecord, draft: CredentialDraft) -> Result<()> {
    if let Some(name) = draft.name {
        record.name = name.trim().to_string();
    }
    if let Some(secret_key) = draft.secret_key {
        record.secret_key = secret_key.trim().to_string();
    }
    if let Some(provider_type) = draft.provider_type {
        record.provider_type = provider_type;
    }
    if let Some(description) = draft.description {
        record.description = clean_description(Some(description));
    }
    if let Some(status) = draft.status {
        record.status = status;
    }

    require_non_empty("name", &record.name)?;
    require_non_empty("secretKey", &record.secret_key)?;

    if let Some(endpoint_url) = draft.endpoint_url {
        require_non_empty("endpointUrl", &endpoint_url)?;
        validate_url("endpointUrl", &endpoint_url)?;
        record.endpoint_url = normalize_endpoint_url(&endpoint_url);
    }

    Ok(())
}
