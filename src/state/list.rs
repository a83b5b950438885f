// Paginated, searchable view over the credential set

use crate::secrets::CredentialSource;
use crate::state::RequestStateCoordinator;
use crate::types::{CredentialRecord, PageQuery, Stats, DEFAULT_PAGE_SIZE};
use crate::utils::Result;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

/// Operation key for list fetches
pub const LIST_KEY: &str = "list";

/// Number of entries shown in the activity feed
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// One "tested X" line of the activity feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub content: String,
    pub tested_at: String,
}

/// Current page of credentials plus the inputs that produced it
pub struct ListController {
    source: Arc<dyn CredentialSource>,
    coordinator: RequestStateCoordinator,
    items: Vec<CredentialRecord>,
    total: usize,
    current_page: usize,
    page_size: usize,
    search_query: String,
}

impl ListController {
    pub fn new(source: Arc<dyn CredentialSource>, coordinator: RequestStateCoordinator) -> Self {
        Self {
            source,
            coordinator,
            items: Vec::new(),
            total: 0,
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search_query: String::new(),
        }
    }

    /// Fetch the page described by the current page, size and search
    pub async fn fetch_list(&mut self) -> Result<()> {
        let query = PageQuery {
            page: self.current_page,
            page_size: self.page_size,
            search: self.search_query.clone(),
        };
        let source = Arc::clone(&self.source);

        let page = self
            .coordinator
            .wrap(LIST_KEY, || async move { source.fetch_page(&query).await })
            .await?;

        self.items = page.items;
        self.total = page.total;
        self.current_page = page.page;
        Ok(())
    }

    /// New search always starts from the first page
    pub async fn search(&mut self, query: &str) -> Result<()> {
        self.search_query = query.trim().to_string();
        self.current_page = 1;
        self.fetch_list().await
    }

    pub async fn set_page(&mut self, page: usize) -> Result<()> {
        self.current_page = page.max(1);
        self.fetch_list().await
    }

    pub async fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        self.page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        self.current_page = 1;
        self.fetch_list().await
    }

    /// Re-issue the current page's fetch
    pub async fn refresh(&mut self) -> Result<()> {
        self.fetch_list().await
    }

    pub fn items(&self) -> &[CredentialRecord] {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size.max(1)).max(1)
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading(LIST_KEY)
    }

    /// Counts over the visible page
    pub fn stats(&self) -> Stats {
        Stats::from_records(self.items.iter())
    }

    pub fn recent_activities(&self) -> Vec<Activity> {
        recent_activities(&self.items, RECENT_ACTIVITY_LIMIT)
    }
}

/// Most recently tested records, newest first
pub fn recent_activities(records: &[CredentialRecord], limit: usize) -> Vec<Activity> {
    let mut tested: Vec<(Option<DateTime<FixedOffset>>, &CredentialRecord, &str)> = records
        .iter()
        .filter_map(|r| {
            r.last_tested_at
                .as_deref()
                .map(|at| (DateTime::parse_from_rfc3339(at).ok(), r, at))
        })
        .collect();

    // Unparseable timestamps sort last
    tested.sort_by(|a, b| b.0.cmp(&a.0));

    tested
        .into_iter()
        .take(limit)
        .map(|(_, record, at)| Activity {
            id: format!("test-{}", record.id),
            content: format!("Tested API: {}", record.name),
            tested_at: at.to_string(),
        })
        .collect()
}
