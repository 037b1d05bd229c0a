use super::error::{ClientError, ClientResult};
use crate::config::client::ClientConfig;
use crate::handlers::notification::{
    MarkAllReadResponse, NotificationListResponse, NotificationResponse,
    NotificationStatsResponse,
};
use crate::models::NotificationType;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

/// One page request against `GET /api/v1/notifications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u64,
    pub limit: u64,
    pub unread_only: bool,
    pub kind: Option<NotificationType>,
}

impl ListRequest {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if self.unread_only {
            query.push(("unread", "true".to_string()));
        }
        if let Some(kind) = self.kind {
            query.push(("type", kind.as_str().to_string()));
        }
        query
    }
}

/// The caller-facing notification endpoints, as seen by a client.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self, request: ListRequest) -> ClientResult<NotificationListResponse>;

    async fn stats(&self) -> ClientResult<NotificationStatsResponse>;

    async fn mark_read(&self, id: Uuid) -> ClientResult<NotificationResponse>;

    async fn mark_all_read(
        &self,
        kind: Option<NotificationType>,
    ) -> ClientResult<MarkAllReadResponse>;

    async fn delete(&self, id: Uuid) -> ClientResult<()>;
}

pub struct HttpNotificationApi {
    base_url: String,
    token: String,
    http: Client,
}

impl HttpNotificationApi {
    pub fn new(config: &ClientConfig, token: impl Into<String>) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout.min(std::time::Duration::from_secs(5)))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/notifications{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Maps non-2xx responses onto [`ClientError`], pulling the server's
/// `{"error": ...}` message when there is one.
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or(body);
            Err(ClientError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, request: ListRequest) -> ClientResult<NotificationListResponse> {
        let response = self
            .http
            .get(self.url(""))
            .bearer_auth(&self.token)
            .query(&request.query())
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn stats(&self) -> ClientResult<NotificationStatsResponse> {
        let response = self
            .http
            .get(self.url("/stats"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn mark_read(&self, id: Uuid) -> ClientResult<NotificationResponse> {
        let response = self
            .http
            .patch(self.url(&format!("/{}", id)))
            .bearer_auth(&self.token)
            .json(&json!({ "isRead": true }))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn mark_all_read(
        &self,
        kind: Option<NotificationType>,
    ) -> ClientResult<MarkAllReadResponse> {
        let body = match kind {
            Some(kind) => json!({ "type": kind.as_str() }),
            None => json!({}),
        };
        let response = self
            .http
            .patch(self.url("/read-all"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn delete(&self, id: Uuid) -> ClientResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/{}", id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
