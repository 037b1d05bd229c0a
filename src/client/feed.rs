use super::api::{ListRequest, NotificationApi};
use super::counter::UnreadCounter;
use super::error::ClientResult;
use crate::config::client::{ClientConfig, DEFAULT_FEED_PAGE_SIZE};
use crate::handlers::notification::{MarkAllReadResponse, NotificationResponse};
use crate::models::NotificationType;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub unread_only: bool,
    pub kind: Option<NotificationType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The next page arrived; holds the number of new items kept.
    Appended(usize),
    /// Nothing left to load, or another load is already running.
    Skipped,
    /// A refresh happened while the page was in flight; it was discarded.
    Stale,
}

#[derive(Debug)]
struct FeedState {
    items: Vec<NotificationResponse>,
    page: u64,
    has_more: bool,
    total_count: u64,
    loading_more: bool,
    last_error: Option<String>,
    generation: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 0,
            has_more: true,
            total_count: 0,
            loading_more: false,
            last_error: None,
            generation: 0,
        }
    }
}

/// A paginated, filtered view of the caller's notifications.
///
/// `refresh` bumps a generation counter; any page that was requested under an
/// older generation is thrown away when it lands. Mutations are applied
/// locally before the request is sent and are not rolled back on failure.
pub struct NotificationFeed {
    api: Arc<dyn NotificationApi>,
    counter: Option<Arc<UnreadCounter>>,
    filter: FeedFilter,
    page_size: u64,
    state: Mutex<FeedState>,
}

impl NotificationFeed {
    pub fn new(api: Arc<dyn NotificationApi>, filter: FeedFilter) -> Self {
        Self {
            api,
            counter: None,
            filter,
            page_size: DEFAULT_FEED_PAGE_SIZE,
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Uses the configured page size.
    pub fn from_config(
        api: Arc<dyn NotificationApi>,
        filter: FeedFilter,
        config: &ClientConfig,
    ) -> Self {
        Self::new(api, filter).with_page_size(config.page_size)
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Mutations refresh this counter once the server has answered.
    pub fn with_counter(mut self, counter: Arc<UnreadCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn filter(&self) -> FeedFilter {
        self.filter
    }

    pub fn items(&self) -> Vec<NotificationResponse> {
        self.state.lock().items.clone()
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().has_more
    }

    pub fn total_count(&self) -> u64 {
        self.state.lock().total_count
    }

    pub fn page(&self) -> u64 {
        self.state.lock().page
    }

    pub fn is_loading_more(&self) -> bool {
        self.state.lock().loading_more
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    fn request(&self, page: u64) -> ListRequest {
        ListRequest {
            page,
            limit: self.page_size,
            unread_only: self.filter.unread_only,
            kind: self.filter.kind,
        }
    }

    /// Replaces the list with page 1. After a failed refresh `load_more` is
    /// skipped until a refresh succeeds.
    pub async fn refresh(&self) -> ClientResult<()> {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.loading_more = false;
            // Nothing can be appended until page 1 of this generation lands.
            state.page = 0;
            state.has_more = false;
            state.generation
        };

        let result = self.api.list(self.request(1)).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::trace!(generation, "dropping superseded refresh");
            return Ok(());
        }

        match result {
            Ok(page) => {
                state.items = page.notifications;
                state.page = 1;
                state.has_more = page.pagination.has_next;
                state.total_count = page.pagination.total_count;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Appends the next page. Items already in the list are not appended again.
    ///
    /// Notifications created after the last `refresh` push older rows down a
    /// page; the repeats are dropped here, but the new rows themselves only
    /// show up on the next `refresh`. Until then `items().len()` can stay
    /// below `total_count()` after the feed is exhausted.
    pub async fn load_more(&self) -> ClientResult<LoadOutcome> {
        let (generation, next_page) = {
            let mut state = self.state.lock();
            if state.loading_more || !state.has_more {
                return Ok(LoadOutcome::Skipped);
            }
            state.loading_more = true;
            (state.generation, state.page + 1)
        };

        let result = self.api.list(self.request(next_page)).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            return Ok(LoadOutcome::Stale);
        }
        state.loading_more = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                state.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let known: HashSet<Uuid> = state.items.iter().map(|n| n.id).collect();
        let fresh: Vec<NotificationResponse> = page
            .notifications
            .into_iter()
            .filter(|n| !known.contains(&n.id))
            .collect();
        let appended = fresh.len();

        state.items.extend(fresh);
        state.page = next_page;
        state.has_more = page.pagination.has_next;
        state.total_count = page.pagination.total_count;
        state.last_error = None;

        Ok(LoadOutcome::Appended(appended))
    }

    pub async fn mark_as_read(&self, id: Uuid) -> ClientResult<()> {
        {
            let mut state = self.state.lock();
            if let Some(item) = state.items.iter_mut().find(|n| n.id == id) {
                item.is_read = true;
            }
        }

        match self.api.mark_read(id).await {
            Ok(updated) => {
                let mut state = self.state.lock();
                if let Some(item) = state.items.iter_mut().find(|n| n.id == id) {
                    *item = updated;
                }
            }
            Err(e) => {
                self.state.lock().last_error = Some(e.to_string());
                self.refresh_counter().await;
                return Err(e);
            }
        }

        self.refresh_counter().await;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        {
            let mut state = self.state.lock();
            let before = state.items.len();
            state.items.retain(|n| n.id != id);
            if state.items.len() < before {
                state.total_count = state.total_count.saturating_sub(1);
            }
        }

        if let Err(e) = self.api.delete(id).await {
            self.state.lock().last_error = Some(e.to_string());
            self.refresh_counter().await;
            return Err(e);
        }

        self.refresh_counter().await;
        Ok(())
    }

    /// Bulk read for this feed's type filter, then reloads the feed and the counter.
    pub async fn mark_all_read(&self) -> ClientResult<MarkAllReadResponse> {
        let result = match &self.counter {
            Some(counter) => counter.mark_all_read(self.filter.kind).await,
            None => self.api.mark_all_read(self.filter.kind).await,
        };
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.state.lock().last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.refresh().await?;
        self.refresh_counter().await;
        Ok(response)
    }

    async fn refresh_counter(&self) {
        if let Some(counter) = &self.counter {
            // Failures are kept on the counter itself.
            let _ = counter.refresh().await;
        }
    }
}
