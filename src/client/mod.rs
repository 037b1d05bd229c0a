//! Polling client for the notification API: an unread badge kept fresh by a
//! background task, and a paginated feed with optimistic mutations.

pub mod api;
pub mod counter;
pub mod error;
pub mod feed;

pub use api::{HttpNotificationApi, ListRequest, NotificationApi};
pub use counter::{PollingHandle, UnreadCounter};
pub use error::{ClientError, ClientResult};
pub use feed::{FeedFilter, LoadOutcome, NotificationFeed};
