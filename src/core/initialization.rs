// Startup wiring
// Opens storage, loads the credential set and builds the controllers

use crate::backup::BackupManager;
use crate::config::{AppConfig, Settings};
use crate::db::{self, KeyValueStorage};
use crate::secrets::transport::{ChatTransport, ReqwestTransport};
use crate::secrets::CredentialStore;
use crate::state::crud::CrudController;
use crate::state::list::ListController;
use crate::state::RequestStateCoordinator;
use crate::utils::{Codec, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything a command needs, built once per process
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<dyn KeyValueStorage>,
    pub store: Arc<CredentialStore>,
    pub coordinator: RequestStateCoordinator,
    pub list: Arc<Mutex<ListController>>,
    pub crud: CrudController,
    pub settings: Settings,
    pub backups: BackupManager,
    /// Set when the stored credential set had to be discarded on load
    pub load_warning: Option<String>,
}

impl AppContext {
    /// Take a backup when autoSave is on; failures are logged only
    pub fn auto_save(&self) {
        if !self.settings.auto_save {
            return;
        }
        if let Err(e) = self.backups.backup() {
            log::warn!("Automatic backup failed: {}", e);
        }
    }

    /// Persist new settings and pick up the retention cap they carry
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        settings.save(self.storage.as_ref())?;
        self.backups = BackupManager::new(Arc::clone(&self.storage))
            .with_max_backups(settings.max_backups);
        self.settings = settings;
        Ok(())
    }
}

/// Build the context from process configuration
pub async fn initialize(config: AppConfig) -> Result<AppContext> {
    log::debug!("Opening storage at {}", config.db_path.display());
    let storage = db::open_storage(&config.db_path)?;
    let transport: Arc<dyn ChatTransport> = Arc::new(ReqwestTransport::new(config.http_timeout)?);
    build(config, storage, transport)
}

/// Wire the context over an already-open storage and transport
pub fn build(
    config: AppConfig,
    storage: Arc<dyn KeyValueStorage>,
    transport: Arc<dyn ChatTransport>,
) -> Result<AppContext> {
    let codec = Arc::new(Codec::from_passphrase(&config.passphrase));
    let store = Arc::new(CredentialStore::new(Arc::clone(&storage), codec, transport));
    let report = store.load()?;

    let settings = Settings::load(storage.as_ref())?;
    let backups = BackupManager::new(Arc::clone(&storage)).with_max_backups(settings.max_backups);

    let coordinator = RequestStateCoordinator::new();
    let list = Arc::new(Mutex::new(ListController::new(
        store.clone(),
        coordinator.clone(),
    )));
    let crud = CrudController::new(Arc::clone(&store), coordinator.clone(), Arc::clone(&list));

    log::debug!("Initialization complete ({} credential(s))", report.count);

    Ok(AppContext {
        config,
        storage,
        store,
        coordinator,
        list,
        crud,
        settings,
        backups,
        load_warning: report.warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{APIS_KEY, BACKUP_PREFIX};
    use crate::db::MemoryStorage;
    use crate::secrets::testing::{draft, StubTransport};
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_config() -> AppConfig {
        AppConfig {
            passphrase: "init-test".to_string(),
            db_path: PathBuf::from(":memory:"),
            http_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_build_reports_unreadable_store() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(APIS_KEY, "not-a-ciphertext").unwrap();

        let ctx = build(test_config(), storage, Arc::new(StubTransport::ok())).unwrap();

        assert!(ctx.load_warning.is_some());
        assert_eq!(ctx.store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_auto_save_follows_setting() {
        let storage = Arc::new(MemoryStorage::new());
        let mut ctx = build(test_config(), storage.clone(), Arc::new(StubTransport::ok())).unwrap();
        ctx.crud.create(draft("A", "https://x", "k")).await.unwrap();

        let mut settings = ctx.settings.clone();
        settings.auto_save = false;
        ctx.save_settings(settings).unwrap();
        ctx.auto_save();
        assert!(storage.list_keys_with_prefix(BACKUP_PREFIX).unwrap().is_empty());

        let mut settings = ctx.settings.clone();
        settings.auto_save = true;
        ctx.save_settings(settings).unwrap();
        ctx.auto_save();
        assert_eq!(storage.list_keys_with_prefix(BACKUP_PREFIX).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_opens_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.db_path = dir.path().join("nested").join("keydeck.db");

        let ctx = initialize(config.clone()).await.unwrap();
        ctx.store.add(draft("A", "https://x", "k")).unwrap();
        drop(ctx);

        let reopened = initialize(config).await.unwrap();
        assert_eq!(reopened.store.len().unwrap(), 1);
        assert_eq!(reopened.load_warning, None);
    }
}
