use super::api::NotificationApi;
use super::error::ClientResult;
use crate::config::client::ClientConfig;
use crate::handlers::notification::{MarkAllReadResponse, NotificationStatsResponse};
use crate::models::NotificationType;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default)]
struct CounterState {
    unread: u64,
    stats: Option<NotificationStatsResponse>,
    last_error: Option<String>,
    /// Sequence number of the response currently shown.
    applied: u64,
}

/// Last-known unread badge. Every request takes a sequence number and a
/// response older than the one already applied is dropped.
pub struct UnreadCounter {
    api: Arc<dyn NotificationApi>,
    sequence: AtomicU64,
    state: Mutex<CounterState>,
}

impl UnreadCounter {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self {
            api,
            sequence: AtomicU64::new(0),
            state: Mutex::new(CounterState::default()),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn unread(&self) -> u64 {
        self.state.lock().unread
    }

    pub fn stats(&self) -> Option<NotificationStatsResponse> {
        self.state.lock().stats.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Fetches stats. On failure the previous figures stay in place.
    /// Returns the unread count shown after the call.
    pub async fn refresh(&self) -> ClientResult<u64> {
        let seq = self.next_sequence();
        let result = self.api.stats().await;

        let mut state = self.state.lock();
        if seq < state.applied {
            tracing::trace!(seq, applied = state.applied, "dropping stale stats response");
            return Ok(state.unread);
        }

        match result {
            Ok(stats) => {
                state.applied = seq;
                state.unread = stats.unread;
                state.stats = Some(stats);
                state.last_error = None;
                Ok(state.unread)
            }
            Err(e) => {
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Bulk read through the API; the badge takes the server's post-update
    /// count straight from the response.
    pub async fn mark_all_read(
        &self,
        kind: Option<NotificationType>,
    ) -> ClientResult<MarkAllReadResponse> {
        let seq = self.next_sequence();
        let result = self.api.mark_all_read(kind).await;

        let mut state = self.state.lock();
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                state.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        if seq >= state.applied {
            state.applied = seq;
            state.unread = response.unread_count;
            state.last_error = None;
            if let Some(stats) = state.stats.as_mut() {
                stats.unread = response.unread_count;
                match kind {
                    Some(kind) => {
                        stats.unread_by_type.remove(&kind);
                    }
                    None => stats.unread_by_type.clear(),
                }
            }
        }

        Ok(response)
    }

    /// [`Self::spawn_polling`] at the configured interval.
    pub fn start_polling(self: &Arc<Self>, config: &ClientConfig) -> PollingHandle {
        self.spawn_polling(config.poll_interval)
    }

    /// Refreshes immediately, then on every `interval` tick and whenever
    /// [`PollingHandle::focus`] is called.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> PollingHandle {
        let counter = Arc::clone(self);
        let focus = Arc::new(Notify::new());
        let wake = Arc::clone(&focus);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {
                        tracing::trace!("refreshing unread count on focus");
                    }
                }

                if let Err(e) = counter.refresh().await {
                    tracing::debug!("unread count refresh failed: {}", e);
                }
            }
        });

        PollingHandle { focus, task }
    }
}

/// Owns the polling task; dropping it stops polling.
pub struct PollingHandle {
    focus: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// The view regained focus.
    pub fn focus(&self) {
        self.focus.notify_one();
    }

    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
